use {
  crate::DecodeError,
  roles_primitives::{Condition, Operator, ParameterType},
  serde::Serialize,
  tracing::trace,
};

const WORD: usize = 32;

/// Position of one layout node within the calldata.
///
/// `location` and `size` are absolute byte offsets into the decoded buffer,
/// also for nodes found inside nested encoded payloads. Dynamic values are
/// located at their length word, so plucking a `Dynamic` node yields the
/// length followed by the padded data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Decoded {
  pub location: usize,
  pub size: usize,

  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<Decoded>,

  /// Index of the alternative picked when the layout node is an `Or`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub variant: Option<usize>,
}

impl Decoded {
  fn leaf(location: usize, size: usize) -> Self {
    Self {
      location,
      size,
      children: vec![],
      variant: None,
    }
  }
}

/// Decodes calldata against a layout tree.
///
/// The root must be `Calldata` (a function call: 4 byte selector followed
/// by the encoded arguments), `AbiEncoded` (encoded values without a
/// selector) or an `Or` of such roots, in which case the first variant that
/// fits the calldata is used.
///
/// Static fields are located without reading them, so a static field past
/// the end of the calldata still decodes; plucking it fails with
/// [`DecodeError::OutOfBounds`].
pub fn decode(
  calldata: &[u8],
  layout: &Condition,
) -> Result<Decoded, DecodeError> {
  Decoder::new(calldata).root(layout)
}

/// The `size` bytes of `calldata` starting at `location`.
pub fn pluck(
  calldata: &[u8],
  location: usize,
  size: usize,
) -> Result<&[u8], DecodeError> {
  location
    .checked_add(size)
    .and_then(|end| calldata.get(location..end))
    .ok_or(DecodeError::OutOfBounds { location, size })
}

/// Whether a field is encoded out of line, behind an offset in the head of
/// its region. Nested encoded payloads are always carried as `bytes`.
fn occupies_tail(layout: &Condition) -> bool {
  match layout.param_type() {
    ParameterType::Static => false,
    ParameterType::Dynamic
    | ParameterType::Array
    | ParameterType::Calldata
    | ParameterType::AbiEncoded => true,
    ParameterType::Tuple | ParameterType::None => {
      layout.children().iter().any(occupies_tail)
    }
  }
}

fn padded(length: usize) -> Option<usize> {
  length.checked_add(WORD - 1).map(|l| l / WORD * WORD)
}

/// A head/tail region. Offsets in its head are relative to `start` and no
/// read may go past `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Frame {
  pub start: usize,
  pub end: usize,
}

/// The head slot of a field within its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
  pub frame: Frame,
  pub head: usize,
}

/// A decoded field together with the bytes it takes in the head and in
/// the tail of its region.
#[derive(Debug)]
pub(crate) struct Field {
  pub decoded: Decoded,
  pub head: usize,
  pub tail: usize,
}

pub(crate) struct Decoder<'a> {
  calldata: &'a [u8],
}

impl<'a> Decoder<'a> {
  pub fn new(calldata: &'a [u8]) -> Self {
    Self { calldata }
  }

  pub fn root(&self, layout: &Condition) -> Result<Decoded, DecodeError> {
    match (layout.param_type(), layout.operator()) {
      (ParameterType::None, Operator::Or) => {
        for (index, variant) in layout.children().iter().enumerate() {
          match self.root(variant) {
            Ok(decoded) => {
              return Ok(Decoded {
                variant: Some(index),
                ..decoded
              })
            }
            Err(e) => trace!("calldata does not fit root variant {index}: {e}"),
          }
        }
        Err(DecodeError::NoVariantMatched)
      }
      (ParameterType::Calldata | ParameterType::AbiEncoded, _) => {
        let frame = self.root_frame(layout.param_type())?;
        let (children, _) = self.block(layout.children().iter(), frame)?;
        Ok(Decoded {
          location: 0,
          size: self.calldata.len(),
          children,
          variant: None,
        })
      }
      (other, _) => Err(DecodeError::InvalidRoot(other)),
    }
  }

  /// The region holding the arguments of a root layout.
  pub fn root_frame(
    &self,
    param_type: ParameterType,
  ) -> Result<Frame, DecodeError> {
    let end = self.calldata.len();
    match param_type {
      ParameterType::Calldata if end < 4 => Err(DecodeError::OutOfBounds {
        location: 0,
        size: 4,
      }),
      ParameterType::Calldata => Ok(Frame { start: 4, end }),
      ParameterType::AbiEncoded => Ok(Frame { start: 0, end }),
      other => Err(DecodeError::InvalidRoot(other)),
    }
  }

  /// Decodes the field whose head slot is `slot`.
  pub fn field(
    &self,
    layout: &Condition,
    slot: Slot,
  ) -> Result<Field, DecodeError> {
    match layout.operator() {
      Operator::Or => self.variant(layout, slot),
      Operator::And | Operator::Nor => self.agreement(layout, slot),

      // value predicates without a parameter of their own
      _ if layout.param_type() == ParameterType::None => Ok(Field {
        decoded: Decoded::leaf(slot.head, 0),
        head: 0,
        tail: 0,
      }),

      _ if occupies_tail(layout) => {
        let offset = self.word(slot.head, slot.frame.end)?;
        let location = slot
          .frame
          .start
          .checked_add(offset)
          .filter(|location| *location <= slot.frame.end)
          .ok_or(DecodeError::OutOfBounds {
            location: slot.frame.start,
            size: offset,
          })?;
        let decoded = self.node(layout, location, slot.frame.end)?;
        Ok(Field {
          tail: decoded.size,
          decoded,
          head: WORD,
        })
      }

      _ => {
        let decoded = self.node(layout, slot.head, slot.frame.end)?;
        Ok(Field {
          head: decoded.size,
          decoded,
          tail: 0,
        })
      }
    }
  }

  /// The region that holds the children of a compound node located at
  /// `location`.
  pub fn frame(
    &self,
    layout: &Condition,
    location: usize,
    end: usize,
  ) -> Result<Frame, DecodeError> {
    match layout.param_type() {
      ParameterType::Array => {
        self.word(location, end)?;
        Ok(Frame {
          start: location + WORD,
          end,
        })
      }
      ParameterType::Calldata | ParameterType::AbiEncoded => {
        let length = self.word(location, end)?;
        let payload = location + WORD;
        let payload_end = payload
          .checked_add(length)
          .filter(|payload_end| *payload_end <= end)
          .ok_or(DecodeError::OutOfBounds {
            location: payload,
            size: length,
          })?;

        if layout.param_type() == ParameterType::AbiEncoded {
          return Ok(Frame {
            start: payload,
            end: payload_end,
          });
        }

        if length < 4 {
          return Err(DecodeError::OutOfBounds {
            location: payload,
            size: 4,
          });
        }
        Ok(Frame {
          start: payload + 4,
          end: payload_end,
        })
      }
      _ => Ok(Frame {
        start: location,
        end,
      }),
    }
  }

  /// Decodes the elements of the array located at `location`.
  ///
  /// Element `i` is laid out by child `i` of the array layout, the last
  /// child standing in for all further elements.
  fn elements(
    &self,
    layout: &Condition,
    location: usize,
    end: usize,
  ) -> Result<Vec<Field>, DecodeError> {
    let length = self.word(location, end)?;
    let frame = self.frame(layout, location, end)?;
    if length > (frame.end - frame.start) / WORD {
      return Err(DecodeError::ArrayTooLong { length });
    }

    let templates = layout.children();
    let Some(last) = templates.last() else {
      return Ok(vec![]);
    };

    let mut head = frame.start;
    let mut fields = Vec::with_capacity(length);
    for index in 0..length {
      let template = templates.get(index).unwrap_or(last);
      let field = self.field(template, Slot { frame, head })?;
      head += field.head;
      fields.push(field);
    }
    Ok(fields)
  }

  fn node(
    &self,
    layout: &Condition,
    location: usize,
    end: usize,
  ) -> Result<Decoded, DecodeError> {
    match layout.param_type() {
      ParameterType::None => Ok(Decoded::leaf(location, 0)),
      ParameterType::Static => Ok(Decoded::leaf(location, WORD)),
      ParameterType::Dynamic => {
        let length = self.word(location, end)?;
        let size = padded(length)
          .and_then(|data| data.checked_add(WORD))
          .ok_or(DecodeError::OutOfBounds {
            location,
            size: length,
          })?;
        within(location, size, end)?;
        Ok(Decoded::leaf(location, size))
      }
      ParameterType::Tuple => {
        let frame = self.frame(layout, location, end)?;
        let (children, size) =
          self.block(layout.children().iter(), frame)?;
        Ok(Decoded {
          location,
          size,
          children,
          variant: None,
        })
      }
      ParameterType::Array => {
        let elements = self.elements(layout, location, end)?;
        let region: usize = elements.iter().map(|e| e.head + e.tail).sum();
        Ok(Decoded {
          location,
          size: WORD + region,
          children: elements.into_iter().map(|e| e.decoded).collect(),
          variant: None,
        })
      }
      ParameterType::Calldata | ParameterType::AbiEncoded => {
        let length = self.word(location, end)?;
        let size = padded(length)
          .and_then(|data| data.checked_add(WORD))
          .ok_or(DecodeError::OutOfBounds {
            location,
            size: length,
          })?;
        within(location, size, end)?;

        let frame = self.frame(layout, location, end)?;
        let (children, _) = self.block(layout.children().iter(), frame)?;
        Ok(Decoded {
          location,
          size,
          children,
          variant: None,
        })
      }
    }
  }

  /// Decodes consecutive fields of a region, returning them together with
  /// the total size of the region.
  fn block<'c>(
    &self,
    layouts: impl Iterator<Item = &'c Condition>,
    frame: Frame,
  ) -> Result<(Vec<Decoded>, usize), DecodeError> {
    let mut head = frame.start;
    let mut tail = 0;
    let mut children = vec![];

    for layout in layouts {
      let field = self.field(layout, Slot { frame, head })?;
      head += field.head;
      tail += field.tail;
      children.push(field.decoded);
    }

    Ok((children, head - frame.start + tail))
  }

  fn variant(
    &self,
    layout: &Condition,
    slot: Slot,
  ) -> Result<Field, DecodeError> {
    for (index, variant) in layout.children().iter().enumerate() {
      match self.field(variant, slot) {
        Ok(field) => {
          return Ok(Field {
            decoded: Decoded {
              variant: Some(index),
              ..field.decoded
            },
            head: field.head,
            tail: field.tail,
          })
        }
        Err(e) => trace!("field does not fit variant {index}: {e}"),
      }
    }
    Err(DecodeError::NoVariantMatched)
  }

  fn agreement(
    &self,
    layout: &Condition,
    slot: Slot,
  ) -> Result<Field, DecodeError> {
    let fields = layout
      .children()
      .iter()
      .map(|branch| self.field(branch, slot))
      .collect::<Result<Vec<_>, _>>()?;

    let Some(first) = fields.first() else {
      return Ok(Field {
        decoded: Decoded::leaf(slot.head, 0),
        head: 0,
        tail: 0,
      });
    };

    let (location, size, head, tail) =
      (first.decoded.location, first.decoded.size, first.head, first.tail);
    if fields.iter().any(|f| {
      f.decoded.location != location || f.decoded.size != size || f.head != head
    }) {
      return Err(DecodeError::VariantsDisagree);
    }

    Ok(Field {
      decoded: Decoded {
        location,
        size,
        children: fields.into_iter().map(|f| f.decoded).collect(),
        variant: None,
      },
      head,
      tail,
    })
  }

  /// Reads the 32 byte word at `at` as an offset or length.
  fn word(&self, at: usize, end: usize) -> Result<usize, DecodeError> {
    within(at, WORD, end)?;
    let word = pluck(self.calldata, at, WORD)?;

    // values that cannot address the buffer are out of bounds anyway
    let (high, low) = word.split_at(WORD - 8);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(low);
    let value = u64::from_be_bytes(bytes);
    match high.iter().all(|b| *b == 0) {
      true => usize::try_from(value).map_err(|_| DecodeError::OutOfBounds {
        location: at,
        size: WORD,
      }),
      false => Err(DecodeError::OutOfBounds {
        location: at,
        size: usize::MAX,
      }),
    }
  }
}

/// Head slots of the decoded fields of a compound node, paired with the
/// layout each field was decoded with.
pub(crate) fn fields<'c, 'd>(
  layout: &'c Condition,
  decoded: &'d [Decoded],
  frame: Frame,
) -> Vec<(Slot, &'c Condition, &'d Decoded)> {
  let templates = layout.children();
  let mut head = frame.start;
  let mut fields = Vec::with_capacity(decoded.len());
  for (index, decoded) in decoded.iter().enumerate() {
    let Some(template) = templates.get(index).or(templates.last()) else {
      break;
    };
    fields.push((Slot { frame, head }, template, decoded));
    head += head_width(template, decoded);
  }
  fields
}

/// Bytes a decoded field takes in the head of its region.
fn head_width(layout: &Condition, decoded: &Decoded) -> usize {
  let branches = layout.children();
  match layout.operator() {
    Operator::And | Operator::Nor => branches
      .first()
      .zip(decoded.children.first())
      .map_or(0, |(branch, decoded)| head_width(branch, decoded)),
    Operator::Or => match decoded.variant.and_then(|i| branches.get(i)) {
      Some(variant) if variant.operator() != Operator::Or => {
        head_width(variant, decoded)
      }
      _ if occupies_tail(layout) => WORD,
      _ => decoded.size,
    },
    _ if layout.param_type() == ParameterType::None => 0,
    _ if occupies_tail(layout) => WORD,
    _ => decoded.size,
  }
}

fn within(location: usize, size: usize, end: usize) -> Result<(), DecodeError> {
  match location.checked_add(size) {
    Some(stop) if stop <= end => Ok(()),
    _ => Err(DecodeError::OutOfBounds { location, size }),
  }
}

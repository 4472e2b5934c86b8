use {
  crate::{
    decode::{fields, pluck, Decoded, Decoder, Frame, Slot},
    Violation,
  },
  alloy_primitives::{Address, B256, I256, U256},
  roles_primitives::{Condition, Operator, ParameterType},
  serde::{Deserialize, Serialize},
  std::collections::BTreeMap,
  tracing::trace,
};

/// What a condition is evaluated against, besides the calldata itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
  /// The account whose permissions are being exercised.
  pub avatar: Address,

  /// Ether sent along with the call.
  #[serde(default)]
  pub value: U256,

  /// Remaining balance of each allowance, by allowance key. Balances are
  /// only read, never consumed.
  #[serde(default)]
  pub allowances: BTreeMap<B256, U256>,
}

/// Evaluates `condition` against `calldata`.
///
/// The condition doubles as the layout of the calldata, so calldata that
/// does not have the described shape fails with [`Violation::Calldata`].
pub fn check(
  calldata: &[u8],
  condition: &Condition,
  context: &Context,
) -> Result<(), Violation> {
  Checker::new(calldata, context, context.value).root(condition)
}

pub(crate) struct Checker<'a> {
  calldata: &'a [u8],
  decoder: Decoder<'a>,
  context: &'a Context,
  value: U256,
}

impl<'a> Checker<'a> {
  pub fn new(calldata: &'a [u8], context: &'a Context, value: U256) -> Self {
    Self {
      calldata,
      decoder: Decoder::new(calldata),
      context,
      value,
    }
  }

  pub fn root(&self, condition: &Condition) -> Result<(), Violation> {
    let children = condition.children();
    let passes = |c: &Condition| self.root(c).is_ok();
    match condition.operator() {
      Operator::And => children.iter().try_for_each(|c| self.root(c)),
      Operator::Or => match children.iter().any(passes) {
        true => Ok(()),
        false => Err(Violation::OrViolation),
      },
      Operator::Nor => match children.iter().any(passes) {
        true => Err(Violation::NorViolation),
        false => Ok(()),
      },
      _ if condition.param_type() == ParameterType::None => {
        let frame = Frame {
          start: 0,
          end: self.calldata.len(),
        };
        let slot = Slot { frame, head: 0 };
        self.evaluate(condition, &Decoded::default(), slot)
      }
      operator => {
        let decoded = self.decoder.root(condition)?;
        let frame = self.decoder.root_frame(condition.param_type())?;
        match operator {
          Operator::Matches => {
            self.fields(condition, &decoded.children, frame)
          }
          Operator::Custom => Err(Violation::UnsupportedCustomCondition),
          _ => Ok(()),
        }
      }
    }
  }

  /// Checks the decoded fields of a region against the children of
  /// `layout`.
  fn fields(
    &self,
    layout: &Condition,
    decoded: &[Decoded],
    frame: Frame,
  ) -> Result<(), Violation> {
    fields(layout, decoded, frame)
      .into_iter()
      .try_for_each(|(slot, condition, decoded)| {
        self.evaluate(condition, decoded, slot)
      })
  }

  /// Decodes the field at `slot` and checks it.
  fn field(&self, condition: &Condition, slot: Slot) -> Result<(), Violation> {
    let field = self.decoder.field(condition, slot)?;
    self.evaluate(condition, &field.decoded, slot)
  }

  /// Whether the field at `slot` decodes with `condition` as its layout
  /// and satisfies it.
  fn passes(&self, condition: &Condition, slot: Slot) -> bool {
    match self.field(condition, slot) {
      Ok(()) => true,
      Err(violation) => {
        trace!("{condition:?} not satisfied: {violation}");
        false
      }
    }
  }

  /// Whether an already decoded field satisfies `condition`.
  fn holds(
    &self,
    condition: &Condition,
    decoded: &Decoded,
    slot: Slot,
  ) -> bool {
    match self.evaluate(condition, decoded, slot) {
      Ok(()) => true,
      Err(violation) => {
        trace!("{condition:?} not satisfied: {violation}");
        false
      }
    }
  }

  /// The decoded elements of an array field with their head slots.
  fn elements<'c, 'd>(
    &self,
    condition: &'c Condition,
    decoded: &'d Decoded,
    slot: Slot,
  ) -> Result<Vec<(Slot, &'c Condition, &'d Decoded)>, Violation> {
    let frame =
      self
        .decoder
        .frame(condition, decoded.location, slot.frame.end)?;
    Ok(fields(condition, &decoded.children, frame))
  }

  fn evaluate(
    &self,
    condition: &Condition,
    decoded: &Decoded,
    slot: Slot,
  ) -> Result<(), Violation> {
    let children = condition.children();
    match condition.operator() {
      Operator::Pass => Ok(()),

      // branches of And and Nor are decoded alongside each other
      Operator::And => children
        .iter()
        .zip(&decoded.children)
        .try_for_each(|(c, d)| self.evaluate(c, d, slot)),

      Operator::Nor => {
        let mut branches = children.iter().zip(&decoded.children);
        match branches.any(|(c, d)| self.holds(c, d, slot)) {
          true => Err(Violation::NorViolation),
          false => Ok(()),
        }
      }

      // only the first fitting variant was decoded
      Operator::Or => {
        match children.iter().any(|c| self.passes(c, slot)) {
          true => Ok(()),
          false => Err(Violation::OrViolation),
        }
      }

      Operator::Matches => {
        if condition.param_type() == ParameterType::Array
          && decoded.children.len() != children.len()
        {
          return Err(Violation::ParameterNotAMatch);
        }
        let frame =
          self
            .decoder
            .frame(condition, decoded.location, slot.frame.end)?;
        self.fields(condition, &decoded.children, frame)
      }

      Operator::ArraySome => {
        let elements = self.elements(condition, decoded, slot)?;
        let mut elements = elements.into_iter();
        match elements.any(|(slot, c, d)| self.holds(c, d, slot)) {
          true => Ok(()),
          false => Err(Violation::NoArrayElementPasses),
        }
      }

      Operator::ArrayEvery => {
        let elements = self.elements(condition, decoded, slot)?;
        let mut elements = elements.into_iter();
        match elements.all(|(slot, c, d)| self.holds(c, d, slot)) {
          true => Ok(()),
          false => Err(Violation::NotEveryArrayElementPasses),
        }
      }

      Operator::ArraySubset => self.subset(condition, decoded, slot),

      Operator::EqualTo => {
        let expected = comp_value(condition);
        let actual = match condition.param_type() {
          ParameterType::Static => {
            self.pluck(decoded.location, expected.len())?
          }
          _ => self.pluck(decoded.location, decoded.size)?,
        };
        match actual == expected {
          true => Ok(()),
          false => Err(Violation::ParameterNotAllowed),
        }
      }

      Operator::GreaterThan => {
        match self.uint(decoded)? > to_uint(comp_value(condition)) {
          true => Ok(()),
          false => Err(Violation::ParameterLessThanAllowed),
        }
      }

      Operator::LessThan => {
        match self.uint(decoded)? < to_uint(comp_value(condition)) {
          true => Ok(()),
          false => Err(Violation::ParameterGreaterThanAllowed),
        }
      }

      Operator::SignedIntGreaterThan => {
        let bound = I256::from_raw(to_uint(comp_value(condition)));
        match I256::from_raw(self.uint(decoded)?) > bound {
          true => Ok(()),
          false => Err(Violation::ParameterLessThanAllowed),
        }
      }

      Operator::SignedIntLessThan => {
        let bound = I256::from_raw(to_uint(comp_value(condition)));
        match I256::from_raw(self.uint(decoded)?) < bound {
          true => Ok(()),
          false => Err(Violation::ParameterGreaterThanAllowed),
        }
      }

      Operator::Bitmask => self.bitmask(condition, decoded),

      Operator::EqualToAvatar => {
        let avatar = self.context.avatar.into_word();
        match self.pluck(decoded.location, 32)? == avatar.as_slice() {
          true => Ok(()),
          false => Err(Violation::ParameterNotAllowed),
        }
      }

      Operator::Custom => Err(Violation::UnsupportedCustomCondition),

      Operator::WithinAllowance => {
        let key = allowance_key(condition);
        let amount = self.uint(decoded)?;
        match self.within_allowance(&key, amount) {
          true => Ok(()),
          false => Err(Violation::AllowanceExceeded(key)),
        }
      }

      Operator::EtherWithinAllowance => {
        let key = allowance_key(condition);
        match self.within_allowance(&key, self.value) {
          true => Ok(()),
          false => Err(Violation::EtherAllowanceExceeded(key)),
        }
      }

      Operator::CallWithinAllowance => {
        let key = allowance_key(condition);
        match self.within_allowance(&key, U256::from(1)) {
          true => Ok(()),
          false => Err(Violation::CallAllowanceExceeded(key)),
        }
      }
    }
  }

  /// Every element is matched by a branch, and no branch matches more
  /// than one element.
  fn subset(
    &self,
    condition: &Condition,
    decoded: &Decoded,
    slot: Slot,
  ) -> Result<(), Violation> {
    let elements = self.elements(condition, decoded, slot)?;
    if elements.is_empty() {
      return Err(Violation::ParameterNotSubsetOfAllowed);
    }

    // every branch is its own layout for the element
    let branches = condition.children();
    let mut taken = vec![false; branches.len()];
    for (element, _, _) in elements {
      let matched = branches.iter().enumerate().find(|(index, branch)| {
        !taken[*index] && self.passes(branch, element)
      });
      match matched {
        Some((index, _)) => taken[index] = true,
        None => return Err(Violation::ParameterNotSubsetOfAllowed),
      }
    }
    Ok(())
  }

  /// The compare value packs a 2 byte shift, a 15 byte mask and the 15
  /// bytes expected under the mask.
  fn bitmask(
    &self,
    condition: &Condition,
    decoded: &Decoded,
  ) -> Result<(), Violation> {
    let value = match condition.param_type() {
      ParameterType::Static => self.pluck(decoded.location, decoded.size)?,
      _ => {
        let data = self.pluck(decoded.location, decoded.size)?;
        data.get(32..).unwrap_or_default()
      }
    };

    let comp = comp_value(condition);
    let (Some(shift), Some(mask), Some(expected)) =
      (comp.get(..2), comp.get(2..17), comp.get(17..32))
    else {
      return Err(Violation::BitmaskNotAllowed);
    };

    let shift = usize::from(u16::from_be_bytes([shift[0], shift[1]]));
    if shift >= value.len() {
      return Err(Violation::BitmaskOverflow);
    }

    let window = &value[shift..];
    let fits = mask.iter().zip(expected).enumerate().all(|(i, (m, e))| {
      window.get(i).copied().unwrap_or_default() & m == *e
    });
    match fits {
      true => Ok(()),
      false => Err(Violation::BitmaskNotAllowed),
    }
  }

  fn within_allowance(&self, key: &B256, amount: U256) -> bool {
    self
      .context
      .allowances
      .get(key)
      .is_some_and(|balance| amount <= *balance)
  }

  fn uint(&self, decoded: &Decoded) -> Result<U256, Violation> {
    Ok(to_uint(self.pluck(decoded.location, 32)?))
  }

  fn pluck(&self, location: usize, size: usize) -> Result<&'a [u8], Violation> {
    Ok(pluck(self.calldata, location, size)?)
  }
}

fn comp_value(condition: &Condition) -> &[u8] {
  condition.comp_value().map(|c| &c[..]).unwrap_or_default()
}

fn to_uint(bytes: &[u8]) -> U256 {
  U256::try_from_be_slice(bytes).unwrap_or_default()
}

fn allowance_key(condition: &Condition) -> B256 {
  B256::try_from(comp_value(condition)).unwrap_or_default()
}

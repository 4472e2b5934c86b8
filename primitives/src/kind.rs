use {
  serde::{Deserialize, Serialize},
  thiserror::Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown {kind} discriminant {value}")]
pub struct UnknownDiscriminant {
  kind: &'static str,
  value: u8,
}

/// Describes how a value is laid out in ABI-encoded calldata.
///
/// The numeric values are part of the wire format and must never change.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum ParameterType {
  /// No layout of its own: logical combinators and predicates that
  /// attach to the surrounding span.
  None = 0,

  /// A single 32-byte word in the head region.
  Static = 1,

  /// Length-prefixed `bytes` or `string`, referenced by an offset word.
  Dynamic = 2,

  /// A struct. Dynamic if any of its fields is dynamic.
  Tuple = 3,

  /// A dynamically sized array: length word followed by the elements.
  Array = 4,

  /// A complete function call, 4-byte selector followed by the arguments.
  Calldata = 5,

  /// An ABI-encoded blob without selector, nested inside a bytes field.
  AbiEncoded = 6,
}

impl TryFrom<u8> for ParameterType {
  type Error = UnknownDiscriminant;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Static,
      2 => Self::Dynamic,
      3 => Self::Tuple,
      4 => Self::Array,
      5 => Self::Calldata,
      6 => Self::AbiEncoded,
      value => {
        return Err(UnknownDiscriminant {
          kind: "parameter type",
          value,
        })
      }
    })
  }
}

impl From<ParameterType> for u8 {
  fn from(value: ParameterType) -> Self {
    value as u8
  }
}

/// The constraint a condition node applies to its span of calldata.
///
/// Gaps in the numbering are reserved slots of the on-chain enforcer.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Operator {
  Pass = 0,
  And = 1,
  Or = 2,
  Nor = 3,
  Matches = 5,
  ArraySome = 6,
  ArrayEvery = 7,
  ArraySubset = 8,
  EqualToAvatar = 15,
  EqualTo = 16,
  GreaterThan = 17,
  LessThan = 18,
  SignedIntGreaterThan = 19,
  SignedIntLessThan = 20,
  Bitmask = 21,
  Custom = 22,
  WithinAllowance = 28,
  EtherWithinAllowance = 29,
  CallWithinAllowance = 30,
}

impl Operator {
  /// And, Or and Nor combine sibling conditions over the same span
  /// and add no structural depth to the decoded layout.
  pub fn is_logical(&self) -> bool {
    matches!(self, Self::And | Self::Or | Self::Nor)
  }
}

impl TryFrom<u8> for Operator {
  type Error = UnknownDiscriminant;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Pass,
      1 => Self::And,
      2 => Self::Or,
      3 => Self::Nor,
      5 => Self::Matches,
      6 => Self::ArraySome,
      7 => Self::ArrayEvery,
      8 => Self::ArraySubset,
      15 => Self::EqualToAvatar,
      16 => Self::EqualTo,
      17 => Self::GreaterThan,
      18 => Self::LessThan,
      19 => Self::SignedIntGreaterThan,
      20 => Self::SignedIntLessThan,
      21 => Self::Bitmask,
      22 => Self::Custom,
      28 => Self::WithinAllowance,
      29 => Self::EtherWithinAllowance,
      30 => Self::CallWithinAllowance,
      value => {
        return Err(UnknownDiscriminant {
          kind: "operator",
          value,
        })
      }
    })
  }
}

impl From<Operator> for u8 {
  fn from(value: Operator) -> Self {
    value as u8
  }
}

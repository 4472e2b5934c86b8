use {
  alloy_primitives::{Address, Selector, B256},
  roles_primitives::ParameterType,
  thiserror::Error,
};

/// Calldata that does not have the shape its layout describes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
  #[error("{size} bytes at offset {location} are out of bounds")]
  OutOfBounds { location: usize, size: usize },

  #[error("array of {length} elements does not fit the calldata")]
  ArrayTooLong { length: usize },

  #[error("{0:?} cannot be the root of a calldata layout")]
  InvalidRoot(ParameterType),

  #[error("none of the layout variants fits the calldata")]
  NoVariantMatched,

  #[error("branches of a combined layout disagree on the field's position")]
  VariantsDisagree,
}

/// Why a call was not authorized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  #[error("calldata is malformed: {0}")]
  Calldata(#[from] DecodeError),

  #[error("calls to {0} are not allowed")]
  TargetAddressNotAllowed(Address),

  #[error("function {selector} on {address} is not allowed")]
  FunctionNotAllowed { address: Address, selector: Selector },

  #[error("calldata is shorter than a function selector")]
  FunctionSignatureTooShort,

  #[error("sending ether is not allowed")]
  SendNotAllowed,

  #[error("delegatecall is not allowed")]
  DelegateCallNotAllowed,

  #[error("none of the alternatives is satisfied")]
  OrViolation,

  #[error("one of the excluded alternatives is satisfied")]
  NorViolation,

  #[error("parameter is not the allowed value")]
  ParameterNotAllowed,

  #[error("parameter is less than or equal to the allowed bound")]
  ParameterLessThanAllowed,

  #[error("parameter is greater than or equal to the allowed bound")]
  ParameterGreaterThanAllowed,

  #[error("parameter does not match the expected structure")]
  ParameterNotAMatch,

  #[error("not every array element passes")]
  NotEveryArrayElementPasses,

  #[error("no array element passes")]
  NoArrayElementPasses,

  #[error("array is not a subset of the allowed elements")]
  ParameterNotSubsetOfAllowed,

  #[error("bitmask shift points past the end of the parameter")]
  BitmaskOverflow,

  #[error("parameter does not match the bitmask")]
  BitmaskNotAllowed,

  #[error("custom conditions need an external contract to evaluate")]
  UnsupportedCustomCondition,

  #[error("allowance {0} exceeded")]
  AllowanceExceeded(B256),

  #[error("ether allowance {0} exceeded")]
  EtherAllowanceExceeded(B256),

  #[error("call allowance {0} exceeded")]
  CallAllowanceExceeded(B256),
}

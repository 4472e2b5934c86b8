use {
  roles_primitives::{Address, ConditionError, Selector},
  thiserror::Error,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error(
    "Permissions for function {selector} on {address} have conflicting \
     send/delegatecall options"
  )]
  ConflictingExecutionOptions { address: Address, selector: Selector },

  #[error(
    "Target-wide permissions on {0} have conflicting send/delegatecall options"
  )]
  ConflictingTargetOptions(Address),

  #[error("Target-wide permission on {0} cannot carry a condition")]
  TargetPermissionWithCondition(Address),

  #[error("Invalid condition: {0}")]
  Condition(#[from] ConditionError),

  #[error(
    "Presets overlap function {selector} on {address} with conditions that \
     cannot be split"
  )]
  UnsupportedPresetOverlap { address: Address, selector: Selector },

  #[error("Invariant violation: {0}")]
  InvariantViolation(&'static str),
}

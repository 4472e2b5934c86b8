use {
  crate::Condition,
  alloy_primitives::{Address, Selector},
  serde::{Deserialize, Serialize},
};

/// How a permitted call may be executed.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct ExecutionOptions {
  /// The call may carry a non-zero ether value.
  #[serde(default)]
  pub send: bool,

  /// The call may be executed as a delegatecall.
  #[serde(default)]
  pub delegatecall: bool,
}

impl ExecutionOptions {
  pub const NONE: Self = Self {
    send: false,
    delegatecall: false,
  };
}

/// Authorization for calls to one contract address.
///
/// A permission with a selector authorizes calls to that one function,
/// optionally constrained by a condition over the call's arguments.
/// A permission without a selector authorizes any call to the target and
/// cannot carry a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
  pub target_address: Address,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selector: Option<Selector>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<Condition>,

  #[serde(flatten)]
  pub options: ExecutionOptions,
}

impl Permission {
  /// Allows calling any function on the target.
  pub fn target(target_address: Address) -> Self {
    Self {
      target_address,
      selector: None,
      condition: None,
      options: ExecutionOptions::NONE,
    }
  }

  /// Allows calling one function on the target, with any arguments.
  pub fn function(target_address: Address, selector: Selector) -> Self {
    Self {
      target_address,
      selector: Some(selector),
      condition: None,
      options: ExecutionOptions::NONE,
    }
  }

  pub fn with_condition(mut self, condition: Condition) -> Self {
    self.condition = Some(condition);
    self
  }

  pub fn with_options(mut self, options: ExecutionOptions) -> Self {
    self.options = options;
    self
  }

  pub fn is_target_wide(&self) -> bool {
    self.selector.is_none()
  }
}

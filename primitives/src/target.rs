use {
  crate::{Condition, ConditionId, ExecutionOptions},
  alloy_primitives::{Address, Selector},
  serde::{Deserialize, Serialize},
};

/// A permitted function of a [`Target`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
  pub selector: Selector,

  /// Constraint over the call's arguments. `None` allows any arguments.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<Condition>,

  #[serde(flatten)]
  pub options: ExecutionOptions,
}

impl Function {
  /// Id of the normalized condition, the identity used when comparing
  /// functions across target sets.
  pub fn condition_id(&self) -> Option<ConditionId> {
    self.condition.as_ref().map(|c| c.normalize().id())
  }

  /// Same selector, same execution options and semantically the same
  /// condition. A missing condition is distinct from any condition.
  pub fn equivalent(&self, other: &Function) -> bool {
    self.selector == other.selector
      && self.options == other.options
      && self.condition_id() == other.condition_id()
  }
}

/// All permissions granted on one contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
  pub address: Address,

  /// Present when any call to the target is allowed regardless of the
  /// function being called.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub wildcard: Option<ExecutionOptions>,

  #[serde(default)]
  pub functions: Vec<Function>,
}

impl Target {
  pub fn new(address: Address) -> Self {
    Self {
      address,
      wildcard: None,
      functions: vec![],
    }
  }

  pub fn function(&self, selector: &Selector) -> Option<&Function> {
    self.functions.iter().find(|f| &f.selector == selector)
  }

  pub fn function_mut(&mut self, selector: &Selector) -> Option<&mut Function> {
    self.functions.iter_mut().find(|f| &f.selector == selector)
  }

  /// A target that grants nothing.
  pub fn is_empty(&self) -> bool {
    self.wildcard.is_none() && self.functions.is_empty()
  }
}

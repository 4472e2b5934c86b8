mod condition;
mod id;
mod kind;
mod normalize;
mod permission;
mod preset;
mod target;

pub use {
  alloy_primitives::{Address, Bytes, Selector, B256, I256, U256},
  condition::{
    Condition,
    ConditionError,
    MAX_CONDITION_DEPTH,
    MAX_SUBSET_BRANCHES,
  },
  id::ConditionId,
  kind::{Operator, ParameterType, UnknownDiscriminant},
  normalize::{is_dynamic_param_type, normalize_condition},
  permission::{ExecutionOptions, Permission},
  preset::{Annotation, ApiInfo, Preset},
  target::{Function, Target},
};

#![allow(dead_code)]

use {
  alloy_sol_types::sol,
  roles_primitives::{Condition, Operator, ParameterType},
};

sol! {
  struct StaticTuple {
    uint256 a;
    address b;
  }

  struct DynamicTuple {
    bytes dynamic;
    uint256 _static;
    uint256[] dynamic32;
  }

  struct SingleDynamicTuple {
    bytes dynamic;
  }

  struct MultiDynamicTuple {
    bytes a;
    uint256 b;
    bytes c;
    uint256[] d;
  }

  function staticFn(bytes4 value);
  function staticTuple(StaticTuple tuple, uint256 value);
  function dynamicTuple(DynamicTuple tuple);
  function singleDynamicTuple(SingleDynamicTuple tuple);
  function multiDynamicTuple(MultiDynamicTuple tuple);
  function dynamic32DynamicStatic(bytes2[] first, string second, uint32 third);
  function arrayStaticTupleItems(StaticTuple[] items);
  function staticDynamic(uint256 first, bytes second);
  function dynamic(bytes data);
  function dynamicArray(bytes[] items);
  function dynamicStaticDynamic32(bytes first, bool second, bytes2[] third);

  function transfer(address to, uint256 amount);
  function execTransaction(address to, uint256 value, bytes data);
  function swap(address[] path, uint256 amountIn);
}

pub fn pass(param_type: ParameterType) -> Condition {
  Condition::pass(param_type).unwrap()
}

pub fn matches(
  param_type: ParameterType,
  children: Vec<Condition>,
) -> Condition {
  Condition::matches(param_type, children).unwrap()
}

pub fn node(
  param_type: ParameterType,
  operator: Operator,
  children: Vec<Condition>,
  comp_value: Option<Vec<u8>>,
) -> Condition {
  Condition::new(param_type, operator, children, comp_value.map(Into::into))
    .unwrap()
}

/// Leaf comparing its field against `comp_value` with `operator`.
pub fn compare(
  param_type: ParameterType,
  operator: Operator,
  comp_value: impl Into<Vec<u8>>,
) -> Condition {
  node(param_type, operator, vec![], Some(comp_value.into()))
}

pub fn or(children: Vec<Condition>) -> Condition {
  Condition::or(children).unwrap()
}

pub fn and(children: Vec<Condition>) -> Condition {
  Condition::and(children).unwrap()
}

/// A 32 byte word holding `value`.
pub fn word(value: u64) -> Vec<u8> {
  let mut word = vec![0u8; 32];
  word[24..].copy_from_slice(&value.to_be_bytes());
  word
}

/// `levels` arrays nested in one another, the innermost holding fields
/// laid out by `leaf`, as the single argument of an encoded payload.
pub fn nested_arrays(levels: usize, leaf: Condition) -> Condition {
  let mut layout = leaf;
  for _ in 0..levels {
    layout = matches(ParameterType::Array, vec![layout]);
  }
  matches(ParameterType::AbiEncoded, vec![layout])
}

/// Encoding of `levels` nested single element arrays around `value`.
pub fn nested_array_calldata(levels: usize, value: u64) -> Vec<u8> {
  let mut calldata = word(32);
  for _ in 1..levels {
    // one element, its offset pointing right behind the offset itself
    calldata.extend(word(1));
    calldata.extend(word(32));
  }
  calldata.extend(word(1));
  calldata.extend(word(value));
  calldata
}

//! Generators of valid conditions and of permission lists that process
//! without conflicts.

use {
  proptest::{collection, option, prelude::*},
  roles_primitives::{
    Address,
    Condition,
    ExecutionOptions,
    Operator,
    ParameterType,
    Permission,
    Selector,
  },
};

fn word(value: u8) -> Vec<u8> {
  let mut word = vec![0u8; 32];
  word[31] = value;
  word
}

fn compare(
  param_type: ParameterType,
  operator: Operator,
  value: Vec<u8>,
) -> Condition {
  Condition::compare(param_type, operator, value).unwrap()
}

/// `fields` static words compared as one tuple.
fn static_tuple(fields: usize, value: u8) -> Condition {
  let pass = Condition::pass(ParameterType::Static).unwrap();
  Condition::new(
    ParameterType::Tuple,
    Operator::EqualTo,
    vec![pass; fields],
    Some(word(value).repeat(fields).into()),
  )
  .unwrap()
}

fn leaf() -> BoxedStrategy<Condition> {
  prop_oneof![
    Just(Condition::pass(ParameterType::Static).unwrap()),
    Just(Condition::pass(ParameterType::Dynamic).unwrap()),
    (0u8..4).prop_map(|v| compare(
      ParameterType::Static,
      Operator::EqualTo,
      word(v)
    )),
    (0u8..4).prop_map(|v| compare(
      ParameterType::Static,
      Operator::GreaterThan,
      word(v)
    )),
    (1u8..3, 1usize..4).prop_map(|(byte, len)| compare(
      ParameterType::Dynamic,
      Operator::EqualTo,
      vec![byte; len]
    )),
    (1usize..3, 0u8..3).prop_map(|(fields, v)| static_tuple(fields, v)),
  ]
  .boxed()
}

/// Conditions on a single argument. `Or` nodes only appear when
/// `alternatives` is set.
fn field(alternatives: bool) -> BoxedStrategy<Condition> {
  leaf()
    .prop_recursive(3, 24, 3, move |inner| {
      let structural = prop_oneof![
        collection::vec(inner.clone(), 1..=3)
          .prop_map(|c| Condition::matches(ParameterType::Tuple, c).unwrap()),
        collection::vec(inner.clone(), 1..=2)
          .prop_map(|c| Condition::matches(ParameterType::Array, c).unwrap()),
        inner.clone().prop_map(|c| {
          let (array, some) = (ParameterType::Array, Operator::ArraySome);
          Condition::new(array, some, vec![c], None).unwrap()
        }),
        collection::vec(inner.clone(), 1..=2)
          .prop_map(|c| Condition::and(c).unwrap()),
        collection::vec(inner.clone(), 1..=2)
          .prop_map(|c| Condition::nor(c).unwrap()),
      ];
      match alternatives {
        true => prop_oneof![
          4 => structural,
          1 => collection::vec(inner, 2..=3)
            .prop_map(|c| Condition::or(c).unwrap()),
        ]
        .boxed(),
        false => structural.boxed(),
      }
    })
    .boxed()
}

/// Conditions on a whole function call.
pub fn condition(alternatives: bool) -> BoxedStrategy<Condition> {
  let call = collection::vec(field(alternatives), 1..=3)
    .prop_map(|f| Condition::matches(ParameterType::Calldata, f).unwrap())
    .boxed();
  match alternatives {
    true => prop_oneof![
      3 => call.clone(),
      1 => collection::vec(call, 2..=3)
        .prop_map(|c| Condition::or(c).unwrap()),
    ]
    .boxed(),
    false => call,
  }
}

fn address(index: u8) -> Address {
  Address::repeat_byte(index + 1)
}

fn selector(index: u8) -> Selector {
  Selector::from([0xf0, 0, 0, index])
}

/// Options are fixed per function, so duplicates never conflict.
fn options(address: u8, selector: Option<u8>) -> ExecutionOptions {
  ExecutionOptions {
    send: address % 2 == 0,
    delegatecall: selector == Some(0),
  }
}

/// One or two grants of the same function.
fn grants(a: u8, s: u8) -> BoxedStrategy<Vec<Permission>> {
  collection::vec(option::of(condition(true)), 1..=2)
    .prop_map(move |conditions| {
      conditions
        .into_iter()
        .map(|condition| Permission {
          target_address: address(a),
          selector: Some(selector(s)),
          condition,
          options: options(a, Some(s)),
        })
        .collect()
    })
    .boxed()
}

/// Permissions over a handful of targets. Every function is granted at
/// most twice and every target-wide grant appears at most once.
pub fn permissions() -> BoxedStrategy<Vec<Permission>> {
  let functions = collection::btree_set((0u8..3, 0u8..3), 1..6)
    .prop_flat_map(|keys| {
      keys
        .into_iter()
        .map(|(a, s)| grants(a, s))
        .collect::<Vec<_>>()
    });
  let wildcards = collection::btree_set(0u8..3, 0..=2).prop_map(|targets| {
    targets
      .into_iter()
      .map(|a| Permission::target(address(a)).with_options(options(a, None)))
      .collect::<Vec<_>>()
  });

  (functions, wildcards)
    .prop_map(|(functions, wildcards)| {
      functions.into_iter().flatten().chain(wildcards).collect()
    })
    .boxed()
}

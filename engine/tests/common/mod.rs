#![allow(dead_code)]

pub mod arbitrary;

use roles_primitives::{
  Address,
  Condition,
  Operator,
  ParameterType,
  Permission,
  Selector,
};

/// Static word equal to `value`.
pub fn equal_word(value: u64) -> Condition {
  let mut word = [0u8; 32];
  word[24..].copy_from_slice(&value.to_be_bytes());
  Condition::compare(ParameterType::Static, Operator::EqualTo, word.to_vec())
    .unwrap()
}

pub fn calldata(args: Vec<Condition>) -> Condition {
  Condition::matches(ParameterType::Calldata, args).unwrap()
}

pub fn any_of(branches: Vec<Condition>) -> Condition {
  Condition::or(branches).unwrap()
}

pub fn token() -> Address {
  "0x6B175474E89094C44Da98b954EedeAC495271d0F".parse().unwrap()
}

pub fn vault() -> Address {
  "0xBA12222222228d8Ba445958a75a0704d566BF2C8".parse().unwrap()
}

/// `approve(address,uint256)`
pub fn approve() -> Selector {
  Selector::from([0x09, 0x5e, 0xa7, 0xb3])
}

/// `transfer(address,uint256)`
pub fn transfer() -> Selector {
  Selector::from([0xa9, 0x05, 0x9c, 0xbb])
}

/// `deposit(uint256,address)`
pub fn deposit() -> Selector {
  Selector::from([0x6e, 0x55, 0x3f, 0x65])
}

/// A role that may approve the vault or a second spender, transfer to
/// one recipient and call anything on the vault.
pub fn role_permissions() -> Vec<Permission> {
  vec![
    Permission::function(token(), approve()).with_condition(calldata(vec![
      any_of(vec![equal_word(0xba12), equal_word(0xc0de)]),
    ])),
    Permission::function(token(), transfer())
      .with_condition(calldata(vec![equal_word(0xbeef), equal_word(100)])),
    Permission::target(vault()),
  ]
}

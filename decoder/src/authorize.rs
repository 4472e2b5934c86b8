use {
  crate::{check::Checker, Context, Violation},
  alloy_primitives::{Address, Selector, U256},
  roles_primitives::{ExecutionOptions, Target},
  serde::{Deserialize, Serialize},
  tracing::debug,
};

/// How the avatar executes a call.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
  #[default]
  Call,
  DelegateCall,
}

/// Decides whether a call is allowed by a set of targets.
///
/// A target-wide grant allows any calldata as long as its execution
/// options allow the call. Otherwise the function selected by the first
/// four bytes of `calldata` must be granted, its execution options must
/// allow the call and its condition, if any, must be satisfied.
pub fn authorize(
  targets: &[Target],
  to: Address,
  value: U256,
  calldata: &[u8],
  operation: Operation,
  context: &Context,
) -> Result<(), Violation> {
  let result = authorize_call(targets, to, value, calldata, operation, context);
  if let Err(ref violation) = result {
    debug!("call to {to} rejected: {violation}");
  }
  result
}

fn authorize_call(
  targets: &[Target],
  to: Address,
  value: U256,
  calldata: &[u8],
  operation: Operation,
  context: &Context,
) -> Result<(), Violation> {
  let target = targets
    .iter()
    .find(|target| target.address == to)
    .ok_or(Violation::TargetAddressNotAllowed(to))?;

  if let Some(options) = target.wildcard {
    let permitted = permits(options, value, operation);
    if permitted.is_ok() || target.functions.is_empty() {
      return permitted;
    }
  }

  let selector = calldata
    .get(..4)
    .map(Selector::from_slice)
    .ok_or(Violation::FunctionSignatureTooShort)?;

  let function =
    target
      .function(&selector)
      .ok_or(Violation::FunctionNotAllowed {
        address: to,
        selector,
      })?;

  permits(function.options, value, operation)?;

  match &function.condition {
    Some(condition) => {
      Checker::new(calldata, context, value).root(condition)
    }
    None => Ok(()),
  }
}

fn permits(
  options: ExecutionOptions,
  value: U256,
  operation: Operation,
) -> Result<(), Violation> {
  if !value.is_zero() && !options.send {
    return Err(Violation::SendNotAllowed);
  }
  if operation == Operation::DelegateCall && !options.delegatecall {
    return Err(Violation::DelegateCallNotAllowed);
  }
  Ok(())
}

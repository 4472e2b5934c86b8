use {
  crate::Error,
  roles_primitives::{
    Address,
    Condition,
    ExecutionOptions,
    Function,
    Operator,
    Permission,
    Selector,
    Target,
  },
  std::collections::{btree_map::Entry, BTreeMap},
  tracing::trace,
};

/// Permissions grouped by target address and function selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
  /// Sorted by address, functions within a target sorted by selector.
  pub targets: Vec<Target>,
}

#[derive(Default)]
struct Grouped {
  wildcard: Option<ExecutionOptions>,
  functions: BTreeMap<Selector, Function>,
}

/// Groups a flat list of permissions into targets.
///
/// Permissions addressing the same function are merged: their execution
/// options must agree, and their conditions are combined so that the
/// merged function allows what either permission allowed. A permission
/// without a condition makes the merged function unconditional. All
/// conditions in the output are normalized.
pub fn process_permissions(
  permissions: &[Permission],
) -> Result<Processed, Error> {
  let mut grouped: BTreeMap<Address, Grouped> = BTreeMap::new();

  for permission in permissions {
    let address = permission.target_address;
    let group = grouped.entry(address).or_default();

    let Some(selector) = permission.selector else {
      if permission.condition.is_some() {
        return Err(Error::TargetPermissionWithCondition(address));
      }
      match group.wildcard {
        Some(existing) if existing != permission.options => {
          return Err(Error::ConflictingTargetOptions(address));
        }
        _ => group.wildcard = Some(permission.options),
      }
      continue;
    };

    match group.functions.entry(selector) {
      Entry::Vacant(entry) => {
        entry.insert(Function {
          selector,
          condition: permission.condition.as_ref().map(Condition::normalize),
          options: permission.options,
        });
      }
      Entry::Occupied(mut entry) => {
        let function = entry.get_mut();
        if function.options != permission.options {
          return Err(Error::ConflictingExecutionOptions { address, selector });
        }

        trace!("merging duplicate permission for {selector} on {address}");
        function.condition =
          match (function.condition.take(), &permission.condition) {
            (Some(existing), Some(incoming)) => {
              Some(merge_conditions(&existing, incoming)?)
            }
            _ => None,
          };
      }
    }
  }

  Ok(Processed {
    targets: grouped
      .into_iter()
      .map(|(address, group)| Target {
        address,
        wildcard: group.wildcard,
        functions: group.functions.into_values().collect(),
      })
      .collect(),
  })
}

/// Flattens targets back into one permission per function and one per
/// target-wide grant. This is the left inverse of [`process_permissions`].
pub fn reconstruct_permissions(targets: &[Target]) -> Vec<Permission> {
  targets
    .iter()
    .flat_map(|target| {
      let wildcard = target.wildcard.map(|options| {
        Permission::target(target.address).with_options(options)
      });

      let functions = target.functions.iter().map(|function| Permission {
        target_address: target.address,
        selector: Some(function.selector),
        condition: function.condition.clone(),
        options: function.options,
      });

      wildcard.into_iter().chain(functions)
    })
    .collect()
}

/// Combines two conditions into one that allows what either allowed.
///
/// Structurally identical `Matches` nodes that differ in exactly one child
/// are merged at that child, so that splitting the result by one of the
/// inputs gives back the other. Everything else becomes an `Or`.
pub fn merge_conditions(
  a: &Condition,
  b: &Condition,
) -> Result<Condition, Error> {
  let (a, b) = (a.normalize(), b.normalize());
  if a.id() == b.id() {
    return Ok(a);
  }

  if let Some(index) = single_differing_child(&a, &b) {
    let merged = merge_conditions(&a.children()[index], &b.children()[index])?;
    let mut children = a.children().to_vec();
    children[index] = merged;
    return Ok(Condition::matches(a.param_type(), children)?.normalize());
  }

  Ok(Condition::or(vec![a, b])?.normalize())
}

/// Index of the only child in which two `Matches` nodes over the same
/// layout differ.
pub(crate) fn single_differing_child(
  a: &Condition,
  b: &Condition,
) -> Option<usize> {
  let comparable = a.operator() == Operator::Matches
    && b.operator() == Operator::Matches
    && a.param_type() == b.param_type()
    && a.children().len() == b.children().len();

  if !comparable {
    return None;
  }

  let mut differing = a
    .children()
    .iter()
    .zip(b.children())
    .enumerate()
    .filter(|(_, (x, y))| x.id() != y.id())
    .map(|(index, _)| index);

  match (differing.next(), differing.next()) {
    (Some(index), None) => Some(index),
    _ => None,
  }
}

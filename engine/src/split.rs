use {
  crate::process::single_differing_child,
  roles_primitives::{Condition, ConditionId, Operator},
  std::collections::HashSet,
  tracing::trace,
};

/// Computes the remainder of `full` after taking out `subset`.
///
/// The remainder is a condition that, merged back together with `subset`,
/// allows exactly what `full` allows. Returns `None` when the two are
/// identical or when no such remainder can be expressed. Inputs are
/// normalized before splitting and the remainder is normalized.
pub fn split_condition(
  full: &Condition,
  subset: &Condition,
) -> Option<Condition> {
  split(&full.normalize(), &subset.normalize())
}

fn split(full: &Condition, subset: &Condition) -> Option<Condition> {
  if full.id() == subset.id() {
    return None;
  }

  if full.operator() == Operator::Or {
    return split_branches(full.children(), subset);
  }

  let index = single_differing_child(full, subset)?;
  trace!("splitting {:?} at child {index}", full.id());

  let remainder = split(&full.children()[index], &subset.children()[index])?;
  let mut children = full.children().to_vec();
  children[index] = remainder;
  Condition::matches(full.param_type(), children)
    .ok()
    .map(|c| c.normalize())
}

fn split_branches(
  branches: &[Condition],
  subset: &Condition,
) -> Option<Condition> {
  if subset.operator() == Operator::Or {
    let taken: HashSet<ConditionId> =
      subset.children().iter().map(Condition::id).collect();

    let remaining: Vec<_> = branches
      .iter()
      .filter(|branch| !taken.contains(&branch.id()))
      .cloned()
      .collect();

    // every branch of the subset has to be a branch of the full condition
    if branches.len() - remaining.len() != taken.len() {
      return None;
    }
    return rebuild(remaining);
  }

  if let Some(position) = branches.iter().position(|b| b.id() == subset.id()) {
    let mut remaining = branches.to_vec();
    remaining.remove(position);
    return rebuild(remaining);
  }

  branches.iter().enumerate().find_map(|(index, branch)| {
    let remainder = split(branch, subset)?;
    let mut remaining = branches.to_vec();
    remaining[index] = remainder;
    rebuild(remaining)
  })
}

fn rebuild(branches: Vec<Condition>) -> Option<Condition> {
  match branches.len() {
    0 => None,
    _ => Condition::or(branches).ok().map(|c| c.normalize()),
  }
}

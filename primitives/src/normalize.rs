use {
  crate::{Condition, Operator, ParameterType},
  std::collections::HashSet,
};

/// Brings a condition into its canonical form.
///
/// Processing starts at the leaves and works up, so every pass can rely on
/// the children of the current node being normalized already. The output
/// is semantically equivalent to the input and the function is idempotent:
/// `normalize(normalize(c)) == normalize(c)`.
pub fn normalize_condition(condition: &Condition) -> Condition {
  let children = condition
    .children()
    .iter()
    .map(normalize_condition)
    .collect();

  let mut result = Condition::assemble(
    condition.param_type(),
    condition.operator(),
    children,
    condition.comp_value().cloned(),
  );
  result = collapse_static_tuple(result);
  result = prune_trailing_static_pass(result);
  result = flatten_nested_logical(result);
  result = dedupe_branches(result);
  result = unwrap_single_branch(result);
  normalize_branch_order(result)
}

impl Condition {
  /// See [`normalize_condition`].
  pub fn normalize(&self) -> Condition {
    normalize_condition(self)
  }
}

/// Whether a field described by this condition is encoded out of line,
/// behind an offset word in the head region.
///
/// Tuples, calldata and logical nodes inherit dynamism from their
/// children.
pub fn is_dynamic_param_type(condition: &Condition) -> bool {
  match condition.param_type() {
    ParameterType::Static => false,
    ParameterType::Dynamic | ParameterType::Array => true,
    ParameterType::Tuple
    | ParameterType::Calldata
    | ParameterType::AbiEncoded
    | ParameterType::None => {
      condition.children().iter().any(is_dynamic_param_type)
    }
  }
}

fn is_logical_branching(condition: &Condition) -> bool {
  condition.operator().is_logical()
}

/// A tuple whose fields are all static words is the same thing as one
/// word-aligned static blob for matching purposes.
fn collapse_static_tuple(condition: Condition) -> Condition {
  let collapsible = condition.param_type() == ParameterType::Tuple
    && matches!(condition.operator(), Operator::Pass | Operator::EqualTo)
    && !condition.children().is_empty()
    && condition
      .children()
      .iter()
      .all(|child| child.param_type() == ParameterType::Static);

  if !collapsible {
    return condition;
  }

  Condition::assemble(
    ParameterType::Static,
    condition.operator(),
    vec![],
    condition.comp_value().cloned(),
  )
}

/// Trailing unconstrained static fields of calldata, nested calldata and
/// dynamic tuples carry no information. The first child is always kept,
/// `Matches` must not be empty.
fn prune_trailing_static_pass(condition: Condition) -> Condition {
  if condition.operator() != Operator::Matches {
    return condition;
  }

  let prunable = match condition.param_type() {
    ParameterType::Calldata | ParameterType::AbiEncoded => true,
    ParameterType::Tuple => is_dynamic_param_type(&condition),
    _ => false,
  };

  if !prunable {
    return condition;
  }

  let keep = condition
    .children()
    .iter()
    .rposition(|child| {
      child.operator() != Operator::Pass
        || child.param_type() != ParameterType::Static
    })
    .map_or(1, |index| index + 1);

  if keep == condition.children().len() {
    return condition;
  }

  let mut children = condition.children().to_vec();
  children.truncate(keep);
  condition.with_children(children)
}

/// And(And(a, b), c) becomes And(a, b, c), same for Or. Children are
/// already flat, so a single level of splicing is enough.
fn flatten_nested_logical(condition: Condition) -> Condition {
  let operator = condition.operator();
  if !matches!(operator, Operator::And | Operator::Or) {
    return condition;
  }

  if !condition.children().iter().any(|c| c.operator() == operator) {
    return condition;
  }

  let children = condition
    .children()
    .iter()
    .flat_map(|child| {
      if child.operator() == operator {
        child.children().to_vec()
      } else {
        vec![child.clone()]
      }
    })
    .collect();

  condition.with_children(children)
}

/// Removes branches of And/Or/Nor that are identical to an earlier branch.
fn dedupe_branches(condition: Condition) -> Condition {
  if !is_logical_branching(&condition) {
    return condition;
  }

  let mut seen = HashSet::with_capacity(condition.children().len());
  let unique: Vec<_> = condition
    .children()
    .iter()
    .filter(|child| seen.insert(child.id()))
    .cloned()
    .collect();

  if unique.len() == condition.children().len() {
    return condition;
  }

  condition.with_children(unique)
}

/// And/Or over a single branch is that branch.
fn unwrap_single_branch(condition: Condition) -> Condition {
  let single = matches!(condition.operator(), Operator::And | Operator::Or)
    && condition.children().len() == 1;

  if !single {
    return condition;
  }

  condition.into_children().swap_remove(0)
}

/// Branches of And/Or/Nor are sorted by ascending id. Branches that decode
/// a nested call (calldata, abi-encoded) then move to the front, keeping
/// their relative order, the decoder tries them first when picking a
/// variant.
fn normalize_branch_order(condition: Condition) -> Condition {
  if !is_logical_branching(&condition) {
    return condition;
  }

  let mut ordered = condition.children().to_vec();
  ordered.sort_by_key(|child| child.id());

  let (mut nested, rest): (Vec<_>, Vec<_>) =
    ordered.into_iter().partition(|child| {
      matches!(
        child.param_type(),
        ParameterType::Calldata | ParameterType::AbiEncoded
      )
    });
  nested.extend(rest);

  condition.with_children(nested)
}

use roles_primitives::Target;

/// Everything `a` grants that `b` does not grant in the same way.
///
/// A target-wide grant is reported unless `b` has one with the same
/// options. A function is reported unless `b` has it with the same
/// options and a semantically equal condition. Targets left with nothing
/// to report are dropped.
pub fn diff_targets(a: &[Target], b: &[Target]) -> Vec<Target> {
  a.iter()
    .filter_map(|target| {
      let Some(other) = b.iter().find(|t| t.address == target.address) else {
        return (!target.is_empty()).then(|| target.clone());
      };

      let wildcard = match (target.wildcard, other.wildcard) {
        (Some(ours), Some(theirs)) if ours == theirs => None,
        (ours, _) => ours,
      };

      let functions = target
        .functions
        .iter()
        .filter(|function| {
          other
            .function(&function.selector)
            .map_or(true, |theirs| !function.equivalent(theirs))
        })
        .cloned()
        .collect();

      let diff = Target {
        address: target.address,
        wildcard,
        functions,
      };

      (!diff.is_empty()).then_some(diff)
    })
    .collect()
}

/// Both sets grant exactly the same calls.
pub fn targets_equal(a: &[Target], b: &[Target]) -> bool {
  diff_targets(a, b).is_empty() && diff_targets(b, a).is_empty()
}

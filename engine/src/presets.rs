use {
  crate::{
    diff_targets,
    process_permissions,
    reconstruct_permissions,
    split_condition,
    targets_equal,
    Error,
    Processed,
  },
  rayon::prelude::*,
  roles_primitives::{Annotation, Permission, Preset, Target},
  serde::{Deserialize, Serialize},
  tracing::{debug, info},
};

/// Resolves annotations into presets.
///
/// Implementations fetch or look up the preset an annotation points to.
/// Annotations that cannot be resolved yield `None` and are skipped.
pub trait PresetSource: Sync {
  fn resolve(&self, annotation: &Annotation) -> Option<Preset>;
}

impl<F> PresetSource for F
where
  F: Fn(&Annotation) -> Option<Preset> + Sync,
{
  fn resolve(&self, annotation: &Annotation) -> Option<Preset> {
    self(annotation)
  }
}

/// A role's permissions described through presets.
///
/// Applying all presets and then all remaining permissions grants
/// exactly what the original permissions granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotated {
  /// Presets that are fully covered by the role's permissions.
  pub presets: Vec<Preset>,

  /// What the role grants beyond the confirmed presets.
  pub permissions: Vec<Permission>,
}

/// Explains a role's permissions in terms of the presets named by its
/// annotations.
///
/// A preset is confirmed when adding its permissions to the role's
/// permissions grants nothing new. Presets that fail to resolve or are
/// not confirmed are dropped, so the result always describes the role's
/// effective permissions.
pub fn process_annotations(
  permissions: &[Permission],
  annotations: &[Annotation],
  source: &impl PresetSource,
) -> Result<Annotated, Error> {
  let Processed { targets } = process_permissions(permissions)?;

  let presets: Vec<Preset> = annotations
    .par_iter()
    .filter_map(|annotation| {
      let resolved = source.resolve(annotation);
      if resolved.is_none() {
        debug!("annotation {} could not be resolved", annotation.uri);
      }
      resolved
    })
    .filter(|preset| is_confirmed(preset, permissions, &targets))
    .collect();

  info!(
    "{} of {} annotations confirmed as presets",
    presets.len(),
    annotations.len()
  );

  let preset_permissions: Vec<Permission> = presets
    .iter()
    .flat_map(|preset| preset.permissions.iter().cloned())
    .collect();

  let Processed {
    targets: via_presets,
  } = process_permissions(&preset_permissions)
    .map_err(|_| Error::InvariantViolation("confirmed presets conflict"))?;

  let mut remaining = diff_targets(&targets, &via_presets);
  for target in remaining.iter_mut() {
    split_overlaps(target, &via_presets)?;
  }
  let remaining = reconstruct_permissions(&remaining);

  let recombined: Vec<_> = preset_permissions
    .into_iter()
    .chain(remaining.iter().cloned())
    .collect();

  let Processed { targets: covered } = process_permissions(&recombined)?;
  if !targets_equal(&covered, &targets) {
    return Err(Error::InvariantViolation(
      "presets and remaining permissions do not add up to the role",
    ));
  }

  Ok(Annotated {
    presets,
    permissions: remaining,
  })
}

fn is_confirmed(
  preset: &Preset,
  permissions: &[Permission],
  targets: &[Target],
) -> bool {
  if preset.permissions.is_empty() {
    debug!("preset {} grants nothing", preset.uri);
    return false;
  }

  let combined: Vec<_> = permissions
    .iter()
    .chain(preset.permissions.iter())
    .cloned()
    .collect();

  match process_permissions(&combined) {
    Ok(Processed { targets: applied }) => {
      let extra = diff_targets(&applied, targets);
      if !extra.is_empty() {
        debug!(
          "preset {} grants more than the role on {} targets",
          preset.uri,
          extra.len()
        );
      }
      extra.is_empty()
    }
    Err(e) => {
      debug!("preset {} does not apply to the role: {e}", preset.uri);
      false
    }
  }
}

/// Replaces the condition of every function that is partially granted
/// through presets with what is left after taking out the preset's part.
fn split_overlaps(
  target: &mut Target,
  via_presets: &[Target],
) -> Result<(), Error> {
  let Some(granted) = via_presets.iter().find(|t| t.address == target.address)
  else {
    return Ok(());
  };

  for function in target.functions.iter_mut() {
    let Some(preset_function) = granted.function(&function.selector) else {
      continue;
    };

    let (Some(full), Some(subset)) =
      (&function.condition, &preset_function.condition)
    else {
      return Err(Error::InvariantViolation(
        "partially granted functions must be conditional on both sides",
      ));
    };

    let remainder = split_condition(full, subset).ok_or(
      Error::UnsupportedPresetOverlap {
        address: target.address,
        selector: function.selector,
      },
    )?;
    function.condition = Some(remainder);
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use {
    super::process_annotations,
    crate::Error,
    roles_primitives::{
      Address,
      Annotation,
      ApiInfo,
      Condition,
      Operator,
      ParameterType,
      Permission,
      Preset,
      Selector,
    },
  };

  fn eq(byte: u8) -> Condition {
    let mut word = vec![0u8; 32];
    word[31] = byte;
    Condition::compare(ParameterType::Static, Operator::EqualTo, word).unwrap()
  }

  fn call(args: Vec<Condition>) -> Condition {
    Condition::matches(ParameterType::Calldata, args).unwrap()
  }

  fn annotation(uri: &str) -> Annotation {
    Annotation {
      uri: uri.into(),
      schema: "https://example.org/openapi.json".into(),
    }
  }

  fn preset(uri: &str, permissions: Vec<Permission>) -> Preset {
    Preset {
      uri: uri.into(),
      server_url: None,
      api_info: ApiInfo::default(),
      permissions,
    }
  }

  #[test]
  fn no_annotations_keeps_everything() -> anyhow::Result<()> {
    let address = Address::with_last_byte(1);
    let permissions = vec![
      Permission::function(address, Selector::from([1, 2, 3, 4])),
      Permission::target(Address::with_last_byte(2)),
    ];

    let nothing = |_: &Annotation| -> Option<Preset> { None };
    let annotated = process_annotations(&permissions, &[], &nothing)?;
    assert!(annotated.presets.is_empty());
    assert_eq!(annotated.permissions, permissions);
    Ok(())
  }

  #[test]
  fn preset_covering_whole_functions() -> anyhow::Result<()> {
    let address = Address::with_last_byte(1);
    let approve = Permission::function(address, Selector::from([0, 0, 0, 1]));
    let deposit = Permission::function(address, Selector::from([0, 0, 0, 2]))
      .with_condition(call(vec![eq(1)]));
    let other = Permission::function(address, Selector::from([0, 0, 0, 3]));

    let permissions = vec![approve.clone(), deposit.clone(), other.clone()];
    let source = |a: &Annotation| match a.uri.as_str() {
      "deposit" => {
        Some(preset("deposit", vec![approve.clone(), deposit.clone()]))
      }
      _ => None,
    };

    let annotated = process_annotations(
      &permissions,
      &[annotation("deposit"), annotation("missing")],
      &source,
    )?;
    assert_eq!(annotated.presets.len(), 1);
    assert_eq!(annotated.presets[0].uri, "deposit");
    assert_eq!(annotated.permissions, vec![other]);
    Ok(())
  }

  #[test]
  fn rejects_presets_granting_more() -> anyhow::Result<()> {
    let address = Address::with_last_byte(1);
    let selector = Selector::from([0, 0, 0, 1]);
    let permissions = vec![
      Permission::function(address, selector).with_condition(call(vec![eq(1)]))
    ];

    let source = |a: &Annotation| {
      Some(match a.uri.as_str() {
        "wider" => {
          preset("wider", vec![Permission::function(address, selector)])
        }
        "other" => preset("other", vec![Permission::target(address)]),
        _ => preset("empty", vec![]),
      })
    };

    let annotated = process_annotations(
      &permissions,
      &[annotation("wider"), annotation("other"), annotation("empty")],
      &source,
    )?;
    assert!(annotated.presets.is_empty());
    assert_eq!(annotated.permissions, permissions);
    Ok(())
  }

  #[test]
  fn splits_partially_covered_functions() -> anyhow::Result<()> {
    let address = Address::with_last_byte(1);
    let selector = Selector::from([0, 0, 0, 1]);
    let full = call(vec![Condition::or(vec![eq(1), eq(2)])?, eq(7)]);
    let granted = call(vec![eq(1), eq(7)]);

    let permissions =
      vec![Permission::function(address, selector).with_condition(full)];
    let source = |_: &Annotation| {
      Some(preset("one", vec![
        Permission::function(address, selector).with_condition(granted.clone()),
      ]))
    };

    let annotated =
      process_annotations(&permissions, &[annotation("one")], &source)?;
    assert_eq!(annotated.presets.len(), 1);
    assert_eq!(annotated.permissions, vec![
      Permission::function(address, selector)
        .with_condition(call(vec![eq(2), eq(7)]))
    ]);
    Ok(())
  }

  #[test]
  fn unconditional_function_partially_covered() {
    let address = Address::with_last_byte(1);
    let selector = Selector::from([0, 0, 0, 1]);
    let permissions = vec![Permission::function(address, selector)];
    let source = |_: &Annotation| {
      Some(preset("one", vec![
        Permission::function(address, selector)
          .with_condition(call(vec![eq(1)])),
      ]))
    };

    assert!(matches!(
      process_annotations(&permissions, &[annotation("one")], &source),
      Err(Error::InvariantViolation(_))
    ));
  }
}

use {
  crate::{cli::Format, io},
  roles_engine::PresetSource,
  roles_primitives::{Annotation, Preset},
  std::{collections::HashMap, path::PathBuf},
  tracing::warn,
};

/// Presets loaded from local files, looked up by uri.
#[derive(Debug, Default)]
pub struct PresetFiles {
  presets: HashMap<String, Preset>,
}

impl PresetFiles {
  pub fn load(paths: &[PathBuf], format: Format) -> anyhow::Result<Self> {
    let mut presets = HashMap::new();
    for path in paths {
      let preset: Preset = io::read(path, format)?;
      if presets.contains_key(&preset.uri) {
        warn!(
          "{} overrides an earlier preset for {}",
          path.display(),
          preset.uri
        );
      }
      presets.insert(preset.uri.clone(), preset);
    }
    Ok(Self { presets })
  }

  /// One annotation per loaded preset, in uri order.
  pub fn annotations(&self) -> Vec<Annotation> {
    let mut annotations: Vec<_> = self
      .presets
      .keys()
      .map(|uri| Annotation {
        uri: uri.clone(),
        schema: String::new(),
      })
      .collect();
    annotations.sort_by(|a, b| a.uri.cmp(&b.uri));
    annotations
  }
}

impl PresetSource for PresetFiles {
  fn resolve(&self, annotation: &Annotation) -> Option<Preset> {
    let preset = self.presets.get(&annotation.uri).cloned();
    if preset.is_none() {
      warn!("no preset file for annotation {}", annotation.uri);
    }
    preset
  }
}

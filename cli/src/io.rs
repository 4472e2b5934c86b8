use {
  crate::cli::Format,
  anyhow::Context,
  serde::{de::DeserializeOwned, Serialize},
  std::{
    io::{self, Write},
    path::Path,
  },
};

/// Reads a file encoded in `format`.
pub fn read<T: DeserializeOwned>(
  path: &Path,
  format: Format,
) -> anyhow::Result<T> {
  let bytes = std::fs::read(path)
    .with_context(|| format!("reading {}", path.display()))?;
  decode(&bytes, format).with_context(|| format!("parsing {}", path.display()))
}

pub fn decode<T: DeserializeOwned>(
  bytes: &[u8],
  format: Format,
) -> anyhow::Result<T> {
  Ok(match format {
    Format::Json => serde_json::from_slice(bytes)?,
    Format::Msgpack => rmp_serde::from_slice(bytes)?,
  })
}

pub fn encode<T: Serialize>(
  value: &T,
  format: Format,
) -> anyhow::Result<Vec<u8>> {
  Ok(match format {
    Format::Json => {
      let mut json = serde_json::to_vec_pretty(value)?;
      json.push(b'\n');
      json
    }
    Format::Msgpack => rmp_serde::to_vec_named(value)?,
  })
}

/// Writes `value` to stdout encoded in `format`.
pub fn write<T: Serialize>(value: &T, format: Format) -> anyhow::Result<()> {
  let mut stdout = io::stdout().lock();
  stdout.write_all(&encode(value, format)?)?;
  Ok(stdout.flush()?)
}

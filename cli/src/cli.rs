use {
  alloy_primitives::{Address, U256},
  clap::{Parser, Subcommand, ValueEnum},
  std::path::PathBuf,
};

#[derive(Debug, Parser)]
#[clap(
  name = "roles",
  about = "Inspect, compare and evaluate role permissions"
)]
pub struct CliOptions {
  #[clap(
    long,
    global = true,
    value_enum,
    default_value = "json",
    help = "encoding of input files and of the output"
  )]
  pub format: Format,

  #[clap(subcommand)]
  pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
  Json,
  Msgpack,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Prints the canonical form of a condition.
  Normalize { condition: PathBuf },

  /// Prints the canonical id of a condition.
  Id { condition: PathBuf },

  /// Groups a list of permissions into targets.
  Process { permissions: PathBuf },

  /// Flattens targets back into a list of permissions.
  Reconstruct { targets: PathBuf },

  /// Prints what the first permission list grants beyond the second.
  Diff { a: PathBuf, b: PathBuf },

  /// Prints what remains of a condition after taking out a subset.
  Split { full: PathBuf, subset: PathBuf },

  /// Decodes calldata against a condition used as its layout.
  Decode {
    #[clap(long)]
    layout: PathBuf,

    #[clap(long, help = "hex encoded calldata")]
    calldata: String,
  },

  /// Checks whether a call is allowed by a list of permissions.
  Check {
    #[clap(long)]
    permissions: PathBuf,

    #[clap(long)]
    to: Address,

    #[clap(long, help = "hex encoded calldata")]
    calldata: String,

    #[clap(long, default_value = "0", help = "wei sent along with the call")]
    value: U256,

    #[clap(long)]
    delegatecall: bool,

    #[clap(long, default_value_t = Address::ZERO)]
    avatar: Address,

    #[clap(long, help = "file with remaining allowance balances by key")]
    allowances: Option<PathBuf>,
  },

  /// Explains permissions through the presets they fully cover.
  Presets {
    #[clap(long)]
    permissions: PathBuf,

    #[clap(long = "preset", help = "file holding one resolved preset")]
    presets: Vec<PathBuf>,

    #[clap(
      long,
      help = "annotations to resolve, defaults to one per loaded preset"
    )]
    annotations: Option<PathBuf>,
  },
}

/// Accepts calldata with or without a `0x` prefix.
pub fn parse_calldata(calldata: &str) -> anyhow::Result<Vec<u8>> {
  let trimmed = calldata.trim();
  let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
  Ok(hex::decode(digits)?)
}

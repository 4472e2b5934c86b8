use {
  crate::{
    cli::{parse_calldata, CliOptions, Command},
    source::PresetFiles,
  },
  alloy_primitives::{B256, U256},
  clap::Parser,
  roles_decoder::{authorize, decode, Context, Operation},
  roles_engine::{
    diff_targets,
    process_annotations,
    process_permissions,
    reconstruct_permissions,
    split_condition,
  },
  roles_primitives::{Annotation, Condition, Permission, Target},
  serde::Serialize,
  std::{collections::BTreeMap, process::ExitCode},
  tracing::{debug, info},
  tracing_subscriber::{EnvFilter, FmtSubscriber},
};

mod cli;
mod io;
mod source;

/// Outcome of the `check` command.
#[derive(Debug, Serialize)]
struct Verdict {
  allowed: bool,

  #[serde(skip_serializing_if = "Option::is_none")]
  violation: Option<String>,
}

fn main() -> anyhow::Result<ExitCode> {
  tracing::subscriber::set_global_default(
    FmtSubscriber::builder()
      .with_env_filter(EnvFilter::from_default_env())
      .with_writer(std::io::stderr)
      .finish(),
  )?;

  let opts = CliOptions::parse();
  debug!("options: {opts:?}");

  let format = opts.format;
  match opts.command {
    Command::Normalize { condition } => {
      let condition: Condition = io::read(&condition, format)?;
      io::write(&condition.normalize(), format)?;
    }

    Command::Id { condition } => {
      let condition: Condition = io::read(&condition, format)?;
      io::write(&condition.normalize().id(), format)?;
    }

    Command::Process { permissions } => {
      let permissions: Vec<Permission> = io::read(&permissions, format)?;
      io::write(&process_permissions(&permissions)?.targets, format)?;
    }

    Command::Reconstruct { targets } => {
      let targets: Vec<Target> = io::read(&targets, format)?;
      io::write(&reconstruct_permissions(&targets), format)?;
    }

    Command::Diff { a, b } => {
      let a: Vec<Permission> = io::read(&a, format)?;
      let b: Vec<Permission> = io::read(&b, format)?;
      let diff = diff_targets(
        &process_permissions(&a)?.targets,
        &process_permissions(&b)?.targets,
      );
      info!("{} targets differ", diff.len());
      io::write(&diff, format)?;
    }

    Command::Split { full, subset } => {
      let full: Condition = io::read(&full, format)?;
      let subset: Condition = io::read(&subset, format)?;
      io::write(&split_condition(&full, &subset), format)?;
    }

    Command::Decode { layout, calldata } => {
      let layout: Condition = io::read(&layout, format)?;
      let calldata = parse_calldata(&calldata)?;
      io::write(&decode(&calldata, &layout)?, format)?;
    }

    Command::Check {
      permissions,
      to,
      calldata,
      value,
      delegatecall,
      avatar,
      allowances,
    } => {
      let permissions: Vec<Permission> = io::read(&permissions, format)?;
      let targets = process_permissions(&permissions)?.targets;
      let calldata = parse_calldata(&calldata)?;
      let allowances: BTreeMap<B256, U256> = match allowances {
        Some(path) => io::read(&path, format)?,
        None => BTreeMap::new(),
      };

      let operation = match delegatecall {
        true => Operation::DelegateCall,
        false => Operation::Call,
      };
      let context = Context {
        avatar,
        value,
        allowances,
      };

      let verdict =
        match authorize(&targets, to, value, &calldata, operation, &context) {
          Ok(()) => Verdict {
            allowed: true,
            violation: None,
          },
          Err(violation) => Verdict {
            allowed: false,
            violation: Some(violation.to_string()),
          },
        };
      io::write(&verdict, format)?;
      if !verdict.allowed {
        return Ok(ExitCode::FAILURE);
      }
    }

    Command::Presets {
      permissions,
      presets,
      annotations,
    } => {
      let permissions: Vec<Permission> = io::read(&permissions, format)?;
      let source = PresetFiles::load(&presets, format)?;
      let annotations: Vec<Annotation> = match annotations {
        Some(path) => io::read(&path, format)?,
        None => source.annotations(),
      };

      let annotated = process_annotations(&permissions, &annotations, &source)?;
      io::write(&annotated, format)?;
    }
  }

  Ok(ExitCode::SUCCESS)
}

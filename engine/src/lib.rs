//! Set algebra over role permissions: grouping flat permissions into
//! targets, comparing target sets, splitting conditions and explaining a
//! role's permissions through annotated presets.

mod diff;
mod error;
mod presets;
mod process;
mod split;

pub use {
  diff::{diff_targets, targets_equal},
  error::Error,
  presets::{process_annotations, Annotated, PresetSource},
  process::{
    merge_conditions,
    process_permissions,
    reconstruct_permissions,
    Processed,
  },
  split::split_condition,
};

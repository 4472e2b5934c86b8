//! Decoding of ABI encoded calldata against permission conditions, and
//! checking calls against the permissions they exercise.

mod authorize;
mod check;
mod decode;
mod error;

pub use {
  authorize::{authorize, Operation},
  check::{check, Context},
  decode::{decode, pluck, Decoded},
  error::{DecodeError, Violation},
};

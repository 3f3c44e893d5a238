//! Shared utilities for the modgen framework.
mod errors;
mod id;
mod namegenerator;
mod position;

pub mod math;

pub use errors::{Error, ErrorKind, ModgenResult};
pub use id::{GSym, GetName, Id};
pub use namegenerator::NameGenerator;
pub use position::{SourceLoc, WithPos};

//! Shared utilities for the Tabula toolkit.
mod errors;
mod idx;
mod namegenerator;
mod out_file;

pub mod math;

pub use errors::{Error, TabulaResult};
pub use idx::{IndexRef, IndexedMap};
pub use math::{bits_needed_for, state_bits};
pub use namegenerator::NameGenerator;
pub use out_file::OutputFile;

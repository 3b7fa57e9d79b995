//! Helpers for traversing designs table by table.
mod construct;
mod phase;

pub use construct::{ConstructPass, Named, ParseVal, PassOpt};
pub use phase::Phase;

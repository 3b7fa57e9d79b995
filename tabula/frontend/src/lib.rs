//! Frontend for the Tabula exchange format: a parser producing untyped
//! S-expressions and a builder turning them into a [tabula_ir::Design].
mod builder;
mod exp;
mod parser;

pub use builder::DesignBuilder;
pub use exp::{Exp, ExpKind};
pub use parser::ExpParser;

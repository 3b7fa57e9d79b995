//! Backends for the Tabula toolkit.
mod exp;
mod resources;
mod traits;
mod verilog;

pub use exp::ExpBackend;
pub use resources::ResourcesBackend;
pub use traits::Backend;
pub use verilog::{VerilogBackend, generate_verilog};

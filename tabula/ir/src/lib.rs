//! Internal representation of a table-based hardware design.
//!
//! A [Design] holds modules arranged in a hierarchy. Each module holds
//! tables; a table is a finite state machine whose states contain insns,
//! each insn using one resource of the table. Objects are owned by the
//! design and referred to through typed indices such as [TableIdx].

// Modules defining internal structures.
mod builder;
mod connection;
mod copier;
mod platform;
mod printer;
mod structure;

pub mod numeric;
pub mod operand;
pub mod params;
pub mod resource_class;
pub mod util;

// Re-export types at the module level.
pub use builder::{Builder, validate_ids};
pub use connection::Connection;
pub use copier::copy_table;
pub use numeric::{Numeric, NumericWidth};
pub use params::ResourceParams;
pub use platform::{Definition, Platform, PlatformNode};
pub use printer::Printer;
pub use resource_class::ResourceClass;
pub use structure::{
    Array, ArrayImage, ArrayImageIdx, ClassIdx, Design, Insn, InsnIdx,
    MAX_ADDRESS_WIDTH, Module, ModuleIdx, Profile, Register, RegisterIdx,
    RegisterKind, Resource, ResourceIdx, State, StateIdx, Table, TableIdx,
    UNASSIGNED_ID,
};

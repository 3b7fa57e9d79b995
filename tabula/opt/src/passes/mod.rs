//! Passes over tabula designs.
mod bb_scheduler;
mod clean_empty_state;
mod clean_unreachable_state;
mod clean_unused_register;
mod well_formed;

pub use bb_scheduler::BBScheduler;
pub use clean_empty_state::CleanEmptyState;
pub use clean_unreachable_state::CleanUnreachableState;
pub use clean_unused_register::CleanUnusedRegister;
pub use well_formed::WellFormed;

//! # The Tabula driver
//!
//! This crate plumbs together the Tabula crates and provides the command
//! line interface: read a design, run passes over it and write it out with
//! one of the backends. Libraries should depend on [`tabula_frontend`],
//! [`tabula_ir`], [`tabula_opt`] and [`tabula_backend`] instead.
pub mod cmdline;
pub mod driver;

//! Control Unit shared types.
//!
//! Configuration structures and command-frame types shared between the
//! control unit, its tests and tooling.

pub mod command;
pub mod config;

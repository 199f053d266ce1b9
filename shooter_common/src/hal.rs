//! Hardware abstraction layer types.
//!
//! The control unit talks to motor drivers, encoders and switches only through
//! the [`driver::HalDriver`] trait and the plain data types in [`types`].

pub mod driver;
pub mod types;

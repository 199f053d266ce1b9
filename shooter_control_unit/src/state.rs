//! State machines root.
//!
//! The r axis is positioned against its limit switches rather than through
//! the PID engine; its state machine lives here.

pub mod r_axis;

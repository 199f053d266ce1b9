//! Control engine root.
//!
//! Encoder sampling, the incremental PID engine and the output safety
//! pipeline that turns signed controller output into direction + duty.

pub mod encoder;
pub mod output;
pub mod pid;

//! Runner errors and per-cycle fault flags.
//!
//! Only bring-up failures and a closed command channel are errors; everything
//! that can go wrong inside a cycle is reported as a [`FaultFlags`] bit and
//! the loop continues.

use bitflags::bitflags;
use thiserror::Error;

use shooter_common::hal::driver::HalError;

use crate::transport::TransportError;

/// Errors during RT setup, bring-up or the cycle loop.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// HAL driver error.
    #[error("HAL error: {0}")]
    Hal(#[from] HalError),

    /// Command channel error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

bitflags! {
    /// Non-fatal conditions seen during one cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FaultFlags: u8 {
        /// An r-axis seek stopped before its switch triggered.
        const SEEK_TIMED_OUT    = 0x01;
        /// dt had to be floored or capped.
        const DT_CLAMPED        = 0x02;
        /// A command token did not parse cleanly.
        const MALFORMED_COMMAND = 0x04;
        /// A receive failed and the cycle was skipped.
        const RECEIVE_ERROR     = 0x08;
    }
}

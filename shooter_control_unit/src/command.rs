//! Command processing root.
//!
//! Datagram decoding into the per-axis target frame.

pub mod decoder;

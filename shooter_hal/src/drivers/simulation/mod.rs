//! Simulation driver module.
//!
//! Software stand-in for the main board: quadrature counters driven by the
//! commanded duty, an r axis bounded by two limit switches, and inert
//! conveyor channels.

mod driver;
mod physics;

pub use driver::{SimClock, SimulationDriver};
pub use physics::{EncoderSimulator, RAxisTravel, SimulationParams};

use shooter_common::hal::driver::HalDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn HalDriver> {
    Box::new(SimulationDriver::new())
}

pub mod common;

mod cycle_flow;
mod r_axis_homing;
mod udp_loopback;

//! Command frame and mode types.
//!
//! A command datagram carries up to nine signed integers, one per slot:
//!
//! | Slot | Meaning                                   |
//! |------|-------------------------------------------|
//! | 1    | Theta target [deg]                        |
//! | 2    | Feed mode (see [`FeedMode`])              |
//! | 3    | r-axis mode (see [`RAxisMode`])           |
//! | 4..6 | Further rotary targets [deg]              |
//! | 7..9 | Auxiliary targets (7 = jam direction)     |

use crate::consts::AXIS_SLOTS;
use crate::hal::types::AxisIndex;

/// Theta target slot.
pub const THETA_SLOT: AxisIndex = 1;
/// Feed mode slot.
pub const FEED_SLOT: AxisIndex = 2;
/// r-axis mode slot.
pub const R_AXIS_SLOT: AxisIndex = 3;
/// Jam-prevention direction slot.
pub const JAM_SLOT: AxisIndex = 7;

/// Fixed-size, 1-indexed target array.
///
/// Never cleared between packets: slots a packet does not reach keep the
/// value from the previous packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetFrame {
    slots: [i32; AXIS_SLOTS],
}

impl TargetFrame {
    /// All slots zero.
    pub const fn new() -> Self {
        Self {
            slots: [0; AXIS_SLOTS],
        }
    }

    /// Build a frame from slot values in order (slot 1 first).
    pub fn from_slots(values: [i32; AXIS_SLOTS]) -> Self {
        Self { slots: values }
    }

    /// Value of slot `axis` (1-based). Out-of-range slots read as 0.
    #[inline]
    pub fn get(&self, axis: AxisIndex) -> i32 {
        axis.checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Overwrite slot `axis` (1-based). Out-of-range slots are ignored.
    #[inline]
    pub fn set(&mut self, axis: AxisIndex, value: i32) {
        if let Some(slot) = axis.checked_sub(1).and_then(|i| self.slots.get_mut(i)) {
            *slot = value;
        }
    }

    /// Slot values in order.
    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.slots
    }

    /// Feed mode carried in slot 2.
    #[inline]
    pub fn feed_mode(&self) -> FeedMode {
        FeedMode::from_code(self.get(FEED_SLOT))
    }

    /// r-axis mode carried in slot 3.
    #[inline]
    pub fn r_axis_mode(&self) -> RAxisMode {
        RAxisMode::from_code(self.get(R_AXIS_SLOT))
    }
}

/// r-axis command intent decoded from slot 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RAxisMode {
    /// Any code other than ±1 / ±2: leave the r axis undriven.
    Idle,
    /// `+1`: seek the positive limit switch, then zero the encoder.
    SeekPositive,
    /// `-1`: seek the negative limit switch, then zero the encoder.
    SeekNegative,
    /// `+2`: bang-bang hold near the positive-limit origin.
    HoldNearPositive,
    /// `-2`: bang-bang hold near the negative-limit origin.
    HoldNearNegative,
}

impl RAxisMode {
    /// Decode a wire code.
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::SeekPositive,
            -1 => Self::SeekNegative,
            2 => Self::HoldNearPositive,
            -2 => Self::HoldNearNegative,
            _ => Self::Idle,
        }
    }
}

/// Feed conveyor mode decoded from slot 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// `0`: both feed motors stopped.
    Stop,
    /// `1`: shooting feed forward.
    Forward,
    /// `2`: shooting feed reverse.
    Reverse,
    /// Any other code: treated as stopped.
    Unknown(i32),
}

impl FeedMode {
    /// Decode a wire code.
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Stop,
            1 => Self::Forward,
            2 => Self::Reverse,
            other => Self::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_one_based() {
        let mut frame = TargetFrame::new();
        frame.set(1, 10);
        frame.set(9, -9);
        frame.set(0, 99);
        frame.set(10, 99);

        assert_eq!(frame.get(1), 10);
        assert_eq!(frame.get(9), -9);
        assert_eq!(frame.get(0), 0);
        assert_eq!(frame.get(10), 0);
        assert_eq!(frame.as_slice(), &[10, 0, 0, 0, 0, 0, 0, 0, -9]);
    }

    #[test]
    fn r_axis_codes() {
        assert_eq!(RAxisMode::from_code(1), RAxisMode::SeekPositive);
        assert_eq!(RAxisMode::from_code(-1), RAxisMode::SeekNegative);
        assert_eq!(RAxisMode::from_code(2), RAxisMode::HoldNearPositive);
        assert_eq!(RAxisMode::from_code(-2), RAxisMode::HoldNearNegative);
        assert_eq!(RAxisMode::from_code(0), RAxisMode::Idle);
        assert_eq!(RAxisMode::from_code(7), RAxisMode::Idle);
    }

    #[test]
    fn feed_codes() {
        let frame = TargetFrame::from_slots([0, 2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame.feed_mode(), FeedMode::Reverse);
        assert_eq!(FeedMode::from_code(5), FeedMode::Unknown(5));
    }
}

//! HAL data types exchanged between the control unit and drivers.
//!
//! - `DriveChannel` - Motor driver channel identifiers (MD1..MD8)
//! - `OutputPair` - Direction flag + duty for one channel
//! - `ActuationFrame` - Complete set of channel outputs for one cycle
//! - `SwitchBank` - Snapshot of the digital switch inputs

use bitflags::bitflags;

use crate::consts::DRIVE_CHANNELS;

/// 1-based axis index. Encoder axes are 1..=6, target slots 1..=9.
pub type AxisIndex = usize;

/// Motor driver channel on the main board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveChannel {
    /// Shooting conveyor theta axis.
    Md1,
    /// Shooting conveyor feed.
    Md2,
    /// Not usable on this board revision.
    Md3,
    /// Not usable on this board revision.
    Md4,
    /// Shooting conveyor r axis.
    Md5,
    /// Spare channel, mirrors the theta output.
    Md6,
    /// Sorting conveyor jam prevention.
    Md7,
    /// Sorting conveyor feed.
    Md8,
}

impl DriveChannel {
    /// All channels in board order.
    pub const ALL: [DriveChannel; DRIVE_CHANNELS] = [
        Self::Md1,
        Self::Md2,
        Self::Md3,
        Self::Md4,
        Self::Md5,
        Self::Md6,
        Self::Md7,
        Self::Md8,
    ];

    /// Zero-based slot in an [`ActuationFrame`].
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Md1 => 0,
            Self::Md2 => 1,
            Self::Md3 => 2,
            Self::Md4 => 3,
            Self::Md5 => 4,
            Self::Md6 => 5,
            Self::Md7 => 6,
            Self::Md8 => 7,
        }
    }

    /// Board label, e.g. `"MD5"`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Md1 => "MD1",
            Self::Md2 => "MD2",
            Self::Md3 => "MD3",
            Self::Md4 => "MD4",
            Self::Md5 => "MD5",
            Self::Md6 => "MD6",
            Self::Md7 => "MD7",
            Self::Md8 => "MD8",
        }
    }
}

/// Direction flag and duty for one motor driver channel.
///
/// Direction and duty are always produced and applied together.
/// `direction == true` drives the channel forward (driver DIR pin high).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutputPair {
    /// Forward (`true`) or reverse (`false`).
    pub direction: bool,
    /// Duty-cycle fraction.
    pub duty: f64,
}

impl OutputPair {
    /// Reverse direction, zero duty.
    pub const STOPPED: Self = Self {
        direction: false,
        duty: 0.0,
    };

    /// Create a pair from its parts.
    #[inline]
    pub const fn new(direction: bool, duty: f64) -> Self {
        Self { direction, duty }
    }

    /// Same direction, zero duty.
    #[inline]
    pub const fn stopped(self) -> Self {
        Self {
            direction: self.direction,
            duty: 0.0,
        }
    }
}

/// Complete per-cycle output for all motor driver channels.
///
/// Handed to the driver as a unit so that no channel ever sees a fresh duty
/// with a stale direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActuationFrame {
    channels: [OutputPair; DRIVE_CHANNELS],
}

impl ActuationFrame {
    /// All channels stopped.
    pub const fn stopped() -> Self {
        Self {
            channels: [OutputPair::STOPPED; DRIVE_CHANNELS],
        }
    }

    /// Output for one channel.
    #[inline]
    pub fn get(&self, channel: DriveChannel) -> OutputPair {
        self.channels[channel.index()]
    }

    /// Replace the output for one channel.
    #[inline]
    pub fn set(&mut self, channel: DriveChannel, pair: OutputPair) {
        self.channels[channel.index()] = pair;
    }

    /// Iterate `(channel, output)` in board order.
    pub fn iter(&self) -> impl Iterator<Item = (DriveChannel, OutputPair)> + '_ {
        DriveChannel::ALL
            .iter()
            .map(move |&ch| (ch, self.channels[ch.index()]))
    }

    /// Largest duty across all channels.
    pub fn max_duty(&self) -> f64 {
        self.channels.iter().fold(0.0, |acc, p| acc.max(p.duty))
    }
}

bitflags! {
    /// Snapshot of the digital switch inputs (active = triggered).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SwitchBank: u8 {
        /// SW1: r-axis positive limit.
        const POSITIVE_LIMIT = 0x01;
        /// SW2: r-axis negative limit.
        const NEGATIVE_LIMIT = 0x02;
        /// SW3: auxiliary input.
        const AUX_3          = 0x04;
        /// SW4: auxiliary input.
        const AUX_4          = 0x08;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_indices_are_dense() {
        for (i, ch) in DriveChannel::ALL.iter().enumerate() {
            assert_eq!(ch.index(), i);
            assert_eq!(ch.label(), format!("MD{}", i + 1));
        }
    }

    #[test]
    fn frame_set_get_and_max_duty() {
        let mut frame = ActuationFrame::stopped();
        assert_eq!(frame.max_duty(), 0.0);

        frame.set(DriveChannel::Md5, OutputPair::new(true, 0.5));
        frame.set(DriveChannel::Md7, OutputPair::new(false, 0.2));

        assert_eq!(frame.get(DriveChannel::Md5), OutputPair::new(true, 0.5));
        assert_eq!(frame.get(DriveChannel::Md1), OutputPair::STOPPED);
        assert!((frame.max_duty() - 0.5).abs() < 1e-12);
        assert_eq!(frame.iter().count(), DRIVE_CHANNELS);
    }

    #[test]
    fn stopped_keeps_direction() {
        let pair = OutputPair::new(true, 0.4).stopped();
        assert!(pair.direction);
        assert_eq!(pair.duty, 0.0);
    }
}

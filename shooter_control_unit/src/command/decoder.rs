//! Command datagram decoder.
//!
//! Wire format: ASCII decimal integers separated by `,`, slot 1 first.
//!
//! - Bytes after the first NUL are ignored.
//! - Empty tokens (`",,"`, leading or trailing commas) are skipped.
//! - Tokens beyond slot 9 are ignored.
//! - Each token converts like C `atoi`: leading whitespace, optional sign,
//!   the longest run of digits. No digits → 0. Overflow saturates.
//! - Slots the packet does not reach keep their previous value.
//!
//! Decoding never fails. Anomalies are counted so the caller can log them.

use shooter_common::consts::AXIS_SLOTS;
use shooter_common::control_unit::command::TargetFrame;

/// Summary of one decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeOutcome {
    /// Number of slots overwritten (slots 1..=n).
    pub slots_written: usize,
    /// Tokens that were not a clean integer (decoded leniently).
    pub malformed: usize,
    /// Tokens dropped because all slots were already filled.
    pub overflow: usize,
}

impl DecodeOutcome {
    /// `true` if every token was a clean integer and none were dropped.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.malformed == 0 && self.overflow == 0
    }
}

/// Decode `packet` into `frame`, leaving unreached slots untouched.
pub fn decode_into(frame: &mut TargetFrame, packet: &[u8]) -> DecodeOutcome {
    let end = packet.iter().position(|&b| b == 0).unwrap_or(packet.len());
    let mut outcome = DecodeOutcome::default();

    for token in packet[..end].split(|&b| b == b',').filter(|t| !t.is_empty()) {
        if outcome.slots_written == AXIS_SLOTS {
            outcome.overflow += 1;
            continue;
        }
        let (value, clean) = parse_int(token);
        if !clean {
            outcome.malformed += 1;
        }
        outcome.slots_written += 1;
        frame.set(outcome.slots_written, value);
    }

    outcome
}

/// Lenient integer conversion with `atoi` semantics.
///
/// Returns the value and whether the token was a clean integer (digits with
/// optional sign, surrounded only by whitespace).
pub fn parse_int(token: &[u8]) -> (i32, bool) {
    let mut rest = token;
    while let [first, tail @ ..] = rest {
        if is_c_space(*first) {
            rest = tail;
        } else {
            break;
        }
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    let magnitude = rest[..digits].iter().fold(0i64, |acc, &d| {
        acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
    });
    let signed = if negative { -magnitude } else { magnitude };
    let value = signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;

    let clean = digits > 0 && rest[digits..].iter().all(|&b| is_c_space(b));
    (value, clean)
}

#[inline]
fn is_c_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

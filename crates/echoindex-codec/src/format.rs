//! Echoprint code string layout
//!
//! An encoded fingerprint is a URL-safe base64 string (padding usually
//! stripped) wrapping a zlib stream. The inflated payload is a flat run of
//! little-endian `u32` words with no header:
//!
//! ```text
//! offset  0       4       8       12      16
//!         +-------+-------+-------+-------+---
//!         | time0 | code0 | time1 | code1 | ...
//!         +-------+-------+-------+-------+---
//! ```
//!
//! Even words are time offsets, odd words are codes.

use serde::{Deserialize, Serialize};

/// Size of one little-endian word
pub const WORD_SIZE: usize = 4;

/// Size of one (time, code) unit
pub const PAIR_SIZE: usize = 2 * WORD_SIZE;

/// Byte offset of the time word inside a unit
pub const TIME_OFFSET: usize = 0;

/// Byte offset of the code word inside a unit
pub const CODE_OFFSET: usize = WORD_SIZE;

/// Which fields the decoder keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Keep code and time offset of every pair
    #[default]
    WithTime,
    /// Keep only the codes; presence-in-track is all that matters
    CodesOnly,
}

impl DecodeMode {
    pub fn from_codes_only(codes_only: bool) -> Self {
        if codes_only {
            DecodeMode::CodesOnly
        } else {
            DecodeMode::WithTime
        }
    }

    pub fn keeps_time(self) -> bool {
        matches!(self, DecodeMode::WithTime)
    }
}

/// One decoded (code, time) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEntry {
    pub code: u32,
    /// Absent in codes-only mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u32>,
}

impl DecodedEntry {
    pub fn new(code: u32, time: Option<u32>) -> Self {
        Self { code, time }
    }
}

/// Split one 8-byte unit into `(code, time)`.
pub(crate) fn read_unit(unit: &[u8]) -> (u32, u32) {
    let word = |offset: usize| {
        let mut buf = [0u8; WORD_SIZE];
        buf.copy_from_slice(&unit[offset..offset + WORD_SIZE]);
        u32::from_le_bytes(buf)
    };
    (word(CODE_OFFSET), word(TIME_OFFSET))
}

/// Append one pair in wire order.
pub(crate) fn write_unit(out: &mut Vec<u8>, code: u32, time: u32) {
    out.extend_from_slice(&time.to_le_bytes());
    out.extend_from_slice(&code.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_layout_is_time_then_code() {
        let unit = [0x05, 0, 0, 0, 0xC8, 0, 0, 0];
        assert_eq!(read_unit(&unit), (200, 5));

        let mut out = Vec::new();
        write_unit(&mut out, 200, 5);
        assert_eq!(out, unit);
    }

    #[test]
    fn test_mode_from_flag() {
        assert_eq!(DecodeMode::from_codes_only(true), DecodeMode::CodesOnly);
        assert_eq!(DecodeMode::from_codes_only(false), DecodeMode::WithTime);
        assert!(!DecodeMode::CodesOnly.keeps_time());
    }
}

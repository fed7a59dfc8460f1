//! Code string encoder
//!
//! Produces the same wire format the decoder reads. Used for fixtures and
//! tooling; the indexer itself never encodes.

use crate::decoder::CODE_STRING_ENGINE;
use crate::format::{write_unit, PAIR_SIZE};
use base64::Engine as _;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{self, Write};

/// Encode `(code, time)` pairs as an unpadded base64url zlib string.
pub fn encode(pairs: &[(u32, u32)]) -> io::Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&encode_payload(pairs))?;
    let compressed = encoder.finish()?;

    Ok(CODE_STRING_ENGINE.encode(compressed))
}

/// Raw, uncompressed payload for `pairs`.
pub fn encode_payload(pairs: &[(u32, u32)]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(pairs.len() * PAIR_SIZE);
    for &(code, time) in pairs {
        write_unit(&mut payload, code, time);
    }
    payload
}

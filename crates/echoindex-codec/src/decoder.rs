//! Code string decoder

use crate::error::DecodeError;
use crate::format::{read_unit, DecodeMode, DecodedEntry, PAIR_SIZE};
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{alphabet, Engine as _};
use flate2::{Decompress, FlushDecompress, Status};
use std::borrow::Cow;
use std::io;

/// URL-safe alphabet, lenient about padding and trailing bits
pub(crate) const CODE_STRING_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode one code string into its (code, time) pairs, in wire order.
///
/// Either every pair is returned or an error is; there is no partial result.
pub fn decode(encoded: &str, mode: DecodeMode) -> Result<Vec<DecodedEntry>, DecodeError> {
    let payload = inflate(&unpack_base64(encoded)?)?;

    if payload.len() % PAIR_SIZE != 0 {
        return Err(DecodeError::Format {
            len: payload.len(),
            stride: PAIR_SIZE,
        });
    }

    let keep_time = mode.keeps_time();
    Ok(payload
        .chunks_exact(PAIR_SIZE)
        .map(|unit| {
            let (code, time) = read_unit(unit);
            DecodedEntry::new(code, keep_time.then_some(time))
        })
        .collect())
}

/// Decode only the codes of a code string.
pub fn decode_codes(encoded: &str) -> Result<Vec<u32>, DecodeError> {
    Ok(decode(encoded, DecodeMode::CodesOnly)?
        .into_iter()
        .map(|entry| entry.code)
        .collect())
}

/// Restore `=` padding and base64url-decode.
fn unpack_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = encoded.trim();
    Ok(CODE_STRING_ENGINE.decode(pad(trimmed).as_bytes())?)
}

fn pad(s: &str) -> Cow<'_, str> {
    match s.len() % 4 {
        0 => Cow::Borrowed(s),
        rem => {
            let mut padded = String::with_capacity(s.len() + 4 - rem);
            padded.push_str(s);
            padded.extend(std::iter::repeat('=').take(4 - rem));
            Cow::Owned(padded)
        }
    }
}

/// Inflate a complete zlib stream. A stream that stops before its trailer is
/// an error rather than a short payload.
fn inflate(compressed: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(4).max(64));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }

        let before = (inflater.total_in(), inflater.total_out());
        let input = &compressed[inflater.total_in() as usize..];
        let status = inflater
            .decompress_vec(input, &mut out, FlushDecompress::None)
            .map_err(|e| DecodeError::Inflate(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if matches!(status, Status::StreamEnd) {
            return Ok(out);
        }

        // Output space was available, so no progress means no more input
        if (inflater.total_in(), inflater.total_out()) == before {
            return Err(DecodeError::Inflate(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "zlib stream ended before its trailer",
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode, encode_payload};
    use crate::error::DecodeErrorKind;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(bytes: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_roundtrip_with_time() {
        let pairs = vec![(100, 0), (200, 5), (u32::MAX, 7), (0, u32::MAX)];
        let decoded = decode(&encode(&pairs).unwrap(), DecodeMode::WithTime).unwrap();

        let back: Vec<(u32, u32)> = decoded
            .iter()
            .map(|e| (e.code, e.time.unwrap()))
            .collect();
        assert_eq!(back, pairs);
    }

    #[test]
    fn test_roundtrip_codes_only() {
        let pairs = vec![(42, 1), (42, 2), (7, 3)];
        let decoded = decode(&encode(&pairs).unwrap(), DecodeMode::CodesOnly).unwrap();

        assert!(decoded.iter().all(|e| e.time.is_none()));
        assert_eq!(decode_codes(&encode(&pairs).unwrap()).unwrap(), vec![42, 42, 7]);
    }

    /// Deterministic pseudo-random pairs
    fn generated_pairs(len: usize, seed: u64) -> Vec<(u32, u32)> {
        let mut state = seed;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 32) as u32
        };
        (0..len).map(|_| (next(), next())).collect()
    }

    #[test]
    fn test_roundtrip_generated_sequences() {
        for len in 1..=64 {
            let pairs = generated_pairs(len, len as u64);
            let encoded = encode(&pairs).unwrap();

            let decoded = decode(&encoded, DecodeMode::WithTime).unwrap();
            let back: Vec<(u32, u32)> = decoded
                .iter()
                .map(|e| (e.code, e.time.unwrap()))
                .collect();
            assert_eq!(back, pairs, "len {}", len);

            let codes: Vec<u32> = pairs.iter().map(|&(code, _)| code).collect();
            assert_eq!(decode_codes(&encoded).unwrap(), codes, "len {}", len);
        }
    }

    #[test]
    fn test_roundtrip_highly_compressed_payload() {
        // Repetitive pairs inflate to far more than the initial output buffer
        let mut pairs = generated_pairs(4, 7).repeat(5000);
        pairs.extend(generated_pairs(3000, 11));
        let encoded = encode(&pairs).unwrap();
        assert!(encoded.len() * 4 < pairs.len() * PAIR_SIZE);

        let decoded = decode(&encoded, DecodeMode::WithTime).unwrap();
        assert_eq!(decoded.len(), pairs.len());
        assert!(decoded
            .iter()
            .zip(&pairs)
            .all(|(e, &(code, time))| e.code == code && e.time == Some(time)));
    }

    #[test]
    fn test_known_bytes_map_odd_words_to_codes() {
        // time=5, code=200 then time=9, code=300
        let payload = [5u32, 200, 9, 300]
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .collect::<Vec<u8>>();
        let encoded = CODE_STRING_ENGINE.encode(zlib(&payload));

        let decoded = decode(&encoded, DecodeMode::WithTime).unwrap();
        assert_eq!(
            decoded,
            vec![
                DecodedEntry::new(200, Some(5)),
                DecodedEntry::new(300, Some(9)),
            ]
        );
    }

    #[test]
    fn test_accepts_padded_and_unpadded_input() {
        let encoded = encode(&[(1, 2)]).unwrap();
        let mut padded = encoded.clone();
        while padded.len() % 4 != 0 {
            padded.push('=');
        }

        let a = decode(&encoded, DecodeMode::WithTime).unwrap();
        let b = decode(&padded, DecodeMode::WithTime).unwrap();
        let c = decode(&format!("  {}\n", encoded), DecodeMode::WithTime).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_pad_to_multiple_of_four() {
        assert_eq!(pad("abcd"), "abcd");
        assert_eq!(pad("abc"), "abc=");
        assert_eq!(pad("ab"), "ab==");
        assert_eq!(pad("abcde"), "abcde===");
        assert!(matches!(pad("abcd"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_invalid_character_is_encoding_error() {
        let mut encoded = encode(&[(1, 2), (3, 4)]).unwrap();
        encoded.replace_range(2..3, "*");

        let err = decode(&encoded, DecodeMode::WithTime).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Encoding);
    }

    #[test]
    fn test_standard_alphabet_is_rejected() {
        let err = decode("ab+/", DecodeMode::WithTime).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Encoding);
    }

    #[test]
    fn test_corrupt_stream_is_inflate_error() {
        let encoded = CODE_STRING_ENGINE.encode(b"definitely not zlib");
        let err = decode(&encoded, DecodeMode::WithTime).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Inflate);
    }

    #[test]
    fn test_truncated_stream_is_inflate_error() {
        let mut compressed = zlib(&encode_payload(&[(1, 2), (3, 4), (5, 6)]));
        compressed.truncate(compressed.len() / 2);

        let err = decode(&CODE_STRING_ENGINE.encode(compressed), DecodeMode::WithTime).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::Inflate);
    }

    #[test]
    fn test_bad_stride_is_format_error() {
        for len in [1usize, 4, 7, 9, 12, 15] {
            let encoded = CODE_STRING_ENGINE.encode(zlib(&vec![0xAB; len]));
            match decode(&encoded, DecodeMode::WithTime) {
                Err(DecodeError::Format { len: got, stride }) => {
                    assert_eq!(got, len);
                    assert_eq!(stride, PAIR_SIZE);
                }
                other => panic!("expected format error for {} bytes, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn test_empty_payload_has_no_pairs() {
        let encoded = CODE_STRING_ENGINE.encode(zlib(&[]));
        assert!(decode(&encoded, DecodeMode::WithTime).unwrap().is_empty());
    }
}

//! Echoprint code string codec
//!
//! Decodes the base64url + zlib code strings found in track analysis
//! records into ordered (code, time) pairs.

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;

pub use decoder::{decode, decode_codes};
pub use encoder::{encode, encode_payload};
pub use error::{DecodeError, DecodeErrorKind};
pub use format::{DecodeMode, DecodedEntry, PAIR_SIZE};

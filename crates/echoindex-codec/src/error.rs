//! Decode errors

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Why a code string could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not valid URL-safe base64
    #[error("invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The zlib stream is corrupt or truncated
    #[error("invalid zlib stream: {0}")]
    Inflate(#[source] std::io::Error),

    /// The inflated payload is not a whole number of (time, code) units
    #[error("payload of {len} bytes is not a multiple of {stride}")]
    Format { len: usize, stride: usize },
}

impl DecodeError {
    pub fn kind(&self) -> DecodeErrorKind {
        match self {
            DecodeError::Encoding(_) => DecodeErrorKind::Encoding,
            DecodeError::Inflate(_) => DecodeErrorKind::Inflate,
            DecodeError::Format { .. } => DecodeErrorKind::Format,
        }
    }
}

/// Stable error class used for counters and log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorKind {
    Encoding,
    Inflate,
    Format,
}

impl DecodeErrorKind {
    pub const ALL: [DecodeErrorKind; 3] = [
        DecodeErrorKind::Encoding,
        DecodeErrorKind::Inflate,
        DecodeErrorKind::Format,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DecodeErrorKind::Encoding => "encoding",
            DecodeErrorKind::Inflate => "inflate",
            DecodeErrorKind::Format => "format",
        }
    }
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

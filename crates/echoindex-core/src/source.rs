//! JSON-lines record source
//!
//! Each non-blank line is one JSON document. The track id and the encoded
//! fingerprint are pulled out by dotted field paths, e.g. `meta.track_id`.

use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::SourceConfig;

/// One input record: a track id and its encoded code string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintRecord {
    pub track_id: String,
    pub encoded: String,
}

impl FingerprintRecord {
    pub fn new(track_id: impl Into<String>, encoded: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            encoded: encoded.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid JSON: {source}")]
    Json {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: missing or non-string field '{field}'")]
    MissingField { line: u64, field: String },
}

impl SourceError {
    /// I/O errors stop the run; malformed records are skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Io { .. })
    }
}

/// A dotted path into a JSON document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        Self {
            raw: path.to_string(),
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn resolve<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| current.get(segment.as_str()))
    }

    /// Resolve to a string. Numbers are accepted for ids stored as integers.
    fn resolve_string(&self, value: &Value) -> Option<String> {
        match self.resolve(value)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Iterator over the records of one JSON-lines stream
pub struct RecordSource<R> {
    reader: R,
    path: PathBuf,
    track_id: FieldPath,
    fingerprint: FieldPath,
    line: u64,
    buf: Vec<u8>,
    done: bool,
}

impl RecordSource<BufReader<File>> {
    pub fn open(path: &Path, config: &SourceConfig) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), path, config))
    }
}

impl<R: BufRead> RecordSource<R> {
    pub fn new(reader: R, path: &Path, config: &SourceConfig) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            track_id: FieldPath::parse(&config.track_id_field),
            fingerprint: FieldPath::parse(&config.fingerprint_field),
            line: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    /// 1-based number of the last line read
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Lines are parsed from raw bytes so invalid UTF-8 is a per-line JSON
    /// error rather than a read failure.
    fn parse_line(&self, text: &[u8]) -> Result<FingerprintRecord, SourceError> {
        let value: Value = serde_json::from_slice(text).map_err(|source| SourceError::Json {
            line: self.line,
            source,
        })?;

        let missing = |field: &FieldPath| SourceError::MissingField {
            line: self.line,
            field: field.as_str().to_string(),
        };

        let track_id = self
            .track_id
            .resolve_string(&value)
            .ok_or_else(|| missing(&self.track_id))?;
        let encoded = match self.fingerprint.resolve(&value) {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(missing(&self.fingerprint)),
        };

        Ok(FingerprintRecord { track_id, encoded })
    }
}

impl<R: BufRead> Iterator for RecordSource<R> {
    type Item = Result<FingerprintRecord, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    self.line += 1;
                    let text = trim_ascii_whitespace(&self.buf);
                    if text.is_empty() {
                        continue;
                    }
                    return Some(self.parse_line(text));
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(SourceError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            }
        }
    }
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Count non-blank lines, used to give progress output a total
pub fn count_records(path: &Path) -> Result<u64, SourceError> {
    let io_err = |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut count = 0u64;

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        if buf.iter().any(|b| !b.is_ascii_whitespace()) {
            count += 1;
        }
    }

    Ok(count)
}

//! Shared helpers for the echoindex command-line tools

pub mod output;

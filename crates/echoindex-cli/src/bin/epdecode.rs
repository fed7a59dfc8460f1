//! Decode one Echoprint code string and print its (code, time) pairs as JSON
//!
//! Usage:
//!   epdecode eJxVlImRJCEMBF...
//!   echo eJxVlImRJCEMBF... | epdecode --codes-only

use anyhow::{Context, Result};
use clap::Parser;
use echoindex_cli::output::print_json;
use echoindex_codec::{decode, DecodeMode, DecodedEntry};
use serde::Serialize;
use std::io::Read;

#[derive(Parser, Debug)]
#[command(name = "epdecode")]
#[command(about = "Decode an Echoprint code string", long_about = None)]
struct Args {
    /// Code string (read from stdin when omitted)
    encoded: Option<String>,

    /// Only output codes, without time offsets
    #[arg(long)]
    codes_only: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct DecodeOutput {
    mode: DecodeMode,
    count: usize,
    entries: Vec<DecodedEntry>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    let log_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let encoded = match &args.encoded {
        Some(encoded) => encoded.clone(),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read code string from stdin")?;
            input
        }
    };

    let mode = DecodeMode::from_codes_only(args.codes_only);
    let entries = decode_string(&encoded, mode)?;
    log::debug!("Decoded {} entries from {} characters", entries.len(), encoded.len());

    print_json(&DecodeOutput {
        mode,
        count: entries.len(),
        entries,
    });

    Ok(())
}

fn decode_string(encoded: &str, mode: DecodeMode) -> Result<Vec<DecodedEntry>> {
    decode(encoded, mode).map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("Failed to decode code string ({} error)", kind))
    })
}

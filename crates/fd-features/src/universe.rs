//! Ticker universe list.
//!
//! A plain text file of ticker symbols separated by whitespace or newlines.
//! It is reference metadata: the pipeline only uses it to restrict which
//! entities are loaded.

use crate::Result;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Parse a whitespace-delimited ticker list.
pub fn parse_universe(text: &str) -> BTreeSet<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Read a ticker universe file.
pub fn read_universe(path: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    Ok(parse_universe(&fs::read_to_string(path)?))
}

/// Write tickers one per line, sorted and deduplicated.
pub fn write_universe<S: AsRef<str>>(path: impl AsRef<Path>, tickers: &[S]) -> Result<()> {
    let unique: BTreeSet<&str> = tickers.iter().map(|t| t.as_ref()).collect();
    let mut text = String::new();
    for ticker in unique {
        text.push_str(ticker);
        text.push('\n');
    }
    fs::write(path, text)?;
    Ok(())
}

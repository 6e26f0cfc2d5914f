//! Helpers for the `rapi` inspection tools
//!
//! `time` backs the shim's lifecycle report; the rest formats and parses
//! operator input for `rapi listen`.

pub mod time;

use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Lowercase hex dump of a datagram payload, as printed by `rapi listen --raw`.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse a listen window such as "250ms", "30s", "5m" or "1h".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let (digits, unit) = s.split_at(s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len()));
    let value = digits
        .parse::<u64>()
        .with_context(|| format!("invalid duration {:?}", s))?;

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "" | "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value * 60),
        "h" => Duration::from_secs(value * 3600),
        other => bail!("unknown duration unit {:?} in {:?}", other, s),
    };
    Ok(duration)
}

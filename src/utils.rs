//! Column-name normalization and size formatting helpers.

use crate::constants::transport::SIZE_UNITS;
use crate::types::ByteSize;

/// Normalize a raw column name into its comparable form.
///
/// Lower-cases and trims, collapses each run of whitespace, `.` or `-` into a
/// single `_`, then drops every remaining character that is not alphanumeric
/// or `_`. The result contains only word characters, so applying it twice is
/// the same as applying it once.
pub fn normalize_column<T: AsRef<str>>(raw: T) -> String {
    let lowered = raw.as_ref().trim().to_lowercase();
    let mut normalized = String::with_capacity(lowered.len());
    let mut in_separator_run = false;
    for ch in lowered.chars() {
        if is_separator(ch) {
            if !in_separator_run {
                normalized.push('_');
                in_separator_run = true;
            }
            continue;
        }
        in_separator_run = false;
        if ch.is_alphanumeric() || ch == '_' {
            normalized.push(ch);
        }
    }
    normalized
}

fn is_separator(ch: char) -> bool {
    ch.is_whitespace() || ch == '.' || ch == '-'
}

/// Format a byte count with binary prefixes, rounded to two decimals.
pub fn simplify_bytes(size_bytes: u64) -> ByteSize {
    if size_bytes == 0 {
        return "0B".to_string();
    }
    let mut exponent = 0usize;
    let mut scaled = size_bytes as f64;
    while scaled >= 1024.0 && exponent + 1 < SIZE_UNITS.len() {
        scaled /= 1024.0;
        exponent += 1;
    }
    let rounded = (scaled * 100.0).round() / 100.0;
    format!("{rounded} {}", SIZE_UNITS[exponent])
}

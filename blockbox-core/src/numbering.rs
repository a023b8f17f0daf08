//! Container numbering: label formats and the per-render-pass counter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    #[default]
    Numeric,
    #[serde(alias = "alphabetic")]
    Alpha,
    Roman,
}

impl NumberFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumberFormat::Numeric => "numeric",
            NumberFormat::Alpha => "alpha",
            NumberFormat::Roman => "roman",
        }
    }
}

const ROMAN_TABLE: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// Format a 1-based index. Index 0 has no alpha or roman form and falls back
/// to its decimal string.
pub fn format_number(format: NumberFormat, index: u32) -> String {
    match format {
        NumberFormat::Numeric => index.to_string(),
        NumberFormat::Alpha if index > 0 => to_alpha(index),
        NumberFormat::Roman if index > 0 => to_roman(index),
        _ => index.to_string(),
    }
}

/// Bijective base-26: 1 → A, 26 → Z, 27 → AA, 702 → ZZ, 703 → AAA.
fn to_alpha(mut n: u32) -> String {
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    letters.iter().rev().collect()
}

fn to_roman(mut n: u32) -> String {
    let mut out = String::new();
    for &(value, symbol) in ROMAN_TABLE.iter() {
        while n >= value {
            out.push_str(symbol);
            n -= value;
        }
    }
    out
}

/// Running count of rendered containers per preset key.
///
/// Owned by one render pass; call [`NumberingCounter::reset`] before rendering
/// a new page so counts never leak between requests.
#[derive(Debug, Clone, Default)]
pub struct NumberingCounter {
    counts: HashMap<String, u32>,
}

impl NumberingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more container for `key` and return its 1-based ordinal.
    pub fn next(&mut self, key: &str) -> u32 {
        let count = self.counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn current(&self, key: &str) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }
}

/// Badge text for the `ordinal`-th container (1-based) counting from `start_from`.
pub fn numbering_label(
    format: NumberFormat,
    start_from: u32,
    ordinal: u32,
    prefix: &str,
    suffix: &str,
) -> String {
    let index = start_from.saturating_add(ordinal.saturating_sub(1));
    format!("{}{}{}", prefix, format_number(format, index), suffix)
}

// Micrometer value parser - ordered fallback chain over OCR text lines
//
// Pure and total: always returns an outcome, never panics. Each strategy is
// an independent pure function; the first one that matches wins. Float-parse
// failures inside a strategy mean "no match" and fall through.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::core::types::{ParseStrategy, TextLine};

/// "one or more digits, a decimal separator, one or more digits"
static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[.,]\d+").unwrap());

/// Maximal runs of digits and separators
static NUMERIC_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9.,]+").unwrap());

/// Glyphs the backend commonly misreads in place of digits. Applied once
/// over the full joined text, not per line.
const CONFUSABLE_MAP: [(char, char); 12] = [
    ('O', '0'),
    ('o', '0'),
    ('I', '1'),
    ('l', '1'),
    ('i', '1'),
    ('B', '8'),
    ('b', '8'),
    ('S', '5'),
    ('s', '5'),
    ('Z', '2'),
    ('z', '2'),
    ('G', '6'),
];

/// Outcome of one parse attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedValue {
    pub value: f64,
    pub strategy: ParseStrategy,
}

/// Parse a micrometer reading out of backend text lines
///
/// Strategies, first match wins:
/// 1. Direct decimal in the joined text ("0.128", "0,128")
/// 2. Vertical-digit reconstruction from one-character lines
/// 3. Loose numeric runs that carry a fractional part
/// 4. Direct decimal after confusable-glyph correction
pub fn parse(lines: &[TextLine]) -> Option<ParsedValue> {
    if lines.is_empty() {
        return None;
    }

    let joined = lines.join(" ");

    let parsed = direct_decimal(&joined)
        .map(|value| ParsedValue {
            value,
            strategy: ParseStrategy::DirectDecimal,
        })
        .or_else(|| {
            vertical_digits(lines).map(|value| ParsedValue {
                value,
                strategy: ParseStrategy::VerticalDigits,
            })
        })
        .or_else(|| {
            loose_runs(&joined).map(|value| ParsedValue {
                value,
                strategy: ParseStrategy::LooseRun,
            })
        })
        .or_else(|| {
            direct_decimal(&correct_confusables(&joined)).map(|value| ParsedValue {
                value,
                strategy: ParseStrategy::ConfusableCorrection,
            })
        });

    match &parsed {
        Some(p) => debug!(value = p.value, strategy = ?p.strategy, "parse strategy matched"),
        None => debug!(raw = %joined, "all parse strategies exhausted"),
    }

    parsed
}

/// Strategy 1: first well-formed decimal by scan position
fn direct_decimal(text: &str) -> Option<f64> {
    DECIMAL_RE
        .find(text)
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

/// Strategy 2: reassemble a sideways display read digit-by-digit
///
/// Single-character digit/separator lines accumulate in scan order. A line
/// made entirely of multiple digits/separators is taken as the complete
/// number immediately, discarding anything accumulated so far (preserved
/// from observed backend behavior).
fn vertical_digits(lines: &[TextLine]) -> Option<f64> {
    let mut digits = String::new();

    for line in lines {
        let trimmed = line.trim();
        let mut chars = trimmed.chars();

        match (chars.next(), chars.next()) {
            (Some(c), None) if is_digit_or_separator(c) => digits.push(c),
            (Some(_), Some(_)) if trimmed.chars().all(is_digit_or_separator) => {
                return trimmed.replace(',', ".").parse().ok();
            }
            _ => {}
        }
    }

    if digits.is_empty() {
        return None;
    }

    digits.replace(',', ".").parse().ok()
}

/// Strategy 3: maximal numeric runs, first one with a fractional part wins.
/// Separator-less runs are skipped: a bare integer is noise, since
/// micrometer readings always carry a fractional part.
fn loose_runs(text: &str) -> Option<f64> {
    NUMERIC_RUN_RE.find_iter(text).find_map(|run| {
        let normalized = run.as_str().replace(',', ".");
        let trimmed = normalized.trim_matches('.');
        if trimmed.contains('.') {
            trimmed.parse().ok()
        } else {
            None
        }
    })
}

/// Strategy 4 preparation: substitute confusable glyphs with digits
fn correct_confusables(text: &str) -> String {
    text.chars()
        .map(|c| {
            CONFUSABLE_MAP
                .iter()
                .find(|(wrong, _)| *wrong == c)
                .map(|(_, digit)| *digit)
                .unwrap_or(c)
        })
        .collect()
}

fn is_digit_or_separator(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == ','
}

//! Device-family identification from a free-text distributor label.
//!
//! Each series is one `(predicate, extractor)` entry in [`SERIES_RULES`].
//! The first entry whose predicate accepts the label decides the outcome,
//! even when its extractor then finds nothing, so a Z-series label without
//! a number is never re-read as an S-series one.

use std::sync::LazyLock;

use regex::Regex;

use crate::extract::extract_storage;
use crate::model::{ModelIdentity, ModelKey};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static NETWORK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:lte|4g)\b").expect("valid regex"));

static A_SERIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)a(\d+[a-z]*)(?:\s|$)").expect("valid regex"));
static Z_SERIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"z\s*(?:flip|fold)").expect("valid regex"));
static Z_SERIES_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"z\s*(flip|fold)\s*(\d+)").expect("valid regex"));
static NOTE_20: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"note\s*20").expect("valid regex"));
static S_SERIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)s(\d+)").expect("valid regex"));
static FE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bfe\b").expect("valid regex"));

type Predicate = fn(&str) -> bool;
type Extractor = fn(&str) -> Option<String>;

/// Series rules in priority order. Input is already pre-normalized.
pub const SERIES_RULES: &[(&str, Predicate, Extractor)] = &[
    ("a", is_a_series, a_series),
    ("z", is_z_series, z_series),
    ("note", is_note_series, note_series),
    ("s", is_s_series, s_series),
];

fn is_a_series(s: &str) -> bool {
    A_SERIES.is_match(s)
}

fn is_z_series(s: &str) -> bool {
    Z_SERIES.is_match(s)
}

fn is_note_series(s: &str) -> bool {
    NOTE_20.is_match(s)
}

fn is_s_series(s: &str) -> bool {
    S_SERIES.is_match(s)
}

/// Lowercase, single-spaced, first `lte`/`4g` removed.
pub fn prenormalize(label: &str) -> String {
    let s = label.to_lowercase();
    let s = WHITESPACE.replace_all(&s, " ");
    let s = NETWORK_TAG.replace(&s, "");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

/// Model key and storage for a label. Both are independent: a label can
/// carry a recognizable storage value without a known series, and the
/// reverse.
pub fn identify(label: &str) -> ModelIdentity {
    let normalized = prenormalize(label);
    let model_key = SERIES_RULES
        .iter()
        .find(|(_, matches, _)| matches(normalized.as_str()))
        .and_then(|(_, _, extract)| extract(normalized.as_str()))
        .map(ModelKey::new);
    ModelIdentity {
        model_key,
        storage: extract_storage(&normalized),
    }
}

fn five_g(s: &str) -> &'static str {
    if s.contains("5g") {
        " 5g"
    } else {
        ""
    }
}

fn a_series(s: &str) -> Option<String> {
    let caps = A_SERIES.captures(s)?;
    let v2 = if s.contains("v2") { " v2" } else { "" };
    Some(format!("galaxy a{}{v2}{}", &caps[1], five_g(s)))
}

fn z_series(s: &str) -> Option<String> {
    let caps = Z_SERIES_NUMBER.captures(s)?;
    Some(format!("galaxy z {} {}{}", &caps[1], &caps[2], five_g(s)))
}

fn note_series(s: &str) -> Option<String> {
    if s.contains("ultra") {
        Some("galaxy note 20 ultra".to_string())
    } else {
        Some("galaxy note 20".to_string())
    }
}

fn s_series(s: &str) -> Option<String> {
    let caps = S_SERIES.captures(s)?;
    let number = &caps[1];
    let suffix = if s.contains("ultra") {
        " ultra"
    } else if s.contains("plus") || s.contains('+') {
        " plus"
    } else if FE_TAG.is_match(s) {
        " fe"
    } else {
        ""
    };
    Some(format!("galaxy s{number}{suffix}"))
}

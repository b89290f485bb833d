//! Text normalization for free-text product labels.
//!
//! `normalize` strips the cosmetic variation that differs between the
//! inventory export and the distributor list (5G tags, bracketed grade
//! annotations, `GB` inside parentheses, parentheses, whitespace runs) so
//! that the remaining text can be compared by prefix.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static FIVE_G_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"5G\s+").expect("valid regex"));
static BRACKET_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static PAREN_GB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((\d+)\s*GB\)").expect("valid regex"));
static PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[()]").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static SE_GENERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)SE (\d)(?:st|nd|rd|th) Gen").expect("valid regex"));
static PIXEL_PRO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Pixel (\d+) Pro").expect("valid regex"));
static TB_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)( ?)(TB)\b").expect("valid regex"));

/// Canonical comparable form of a product label.
///
/// The five rules run in a fixed order. The whole sequence is re-applied
/// until the text stops changing, so the result is a fixed point: a rule
/// can expose a new match for an earlier one (`"5G(128GB)"` only becomes
/// `"5G 128"` after the parentheses are gone).
pub fn normalize(label: &str) -> String {
    let mut current = apply_rules(label);
    loop {
        let next = apply_rules(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn apply_rules(label: &str) -> String {
    let s = FIVE_G_TAG.replace_all(label, "");
    let s = BRACKET_TAG.replace_all(&s, "");
    let s = PAREN_GB.replace_all(&s, "($1)");
    let s = PARENS.replace_all(&s, " ");
    let s = WHITESPACE.replace_all(&s, " ");
    s.trim().to_string()
}

/// The normalized name plus one variant per triggered axis.
///
/// Axes are independent: each contributes at most one variant derived from
/// the base name, never from another variant.
pub fn name_variations(name: &str) -> Vec<String> {
    let mut variations = vec![name.to_string()];
    let mut push = |v: String| {
        if !variations.contains(&v) {
            variations.push(v);
        }
    };

    if name.contains(" Plus") {
        push(name.replacen(" Plus", "+", 1));
    } else if name.contains('+') {
        push(name.replacen('+', " Plus", 1));
    }

    if name.contains(" SE ") {
        if let Some(v) = replace_first(&SE_GENERATION, name, |c| format!("SE{}", &c[1])) {
            push(v);
        }
    }

    if name.contains(" Pixel ") {
        if let Some(v) = replace_first(&PIXEL_PRO, name, |c| format!("Pixel {}Pro", &c[1])) {
            push(v);
        }
    }

    let tb = replace_first(&TB_SPACING, name, |c| {
        if c[2].is_empty() {
            format!("{} {}", &c[1], &c[3])
        } else {
            format!("{}{}", &c[1], &c[3])
        }
    });
    if let Some(v) = tb {
        push(v);
    }

    variations
}

fn replace_first(re: &Regex, text: &str, rep: impl Fn(&Captures) -> String) -> Option<String> {
    if !re.is_match(text) {
        return None;
    }
    Some(re.replacen(text, 1, |c: &Captures| rep(c)).into_owned())
}

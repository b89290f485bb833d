//! Attribute extraction: storage capacity, quantity, condition grade, color.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::model::{GradeCode, StorageSpec, StorageUnit};

/// Sizes a bare number may stand for when a label omits the unit. Anything
/// else is too easily a model number or a price.
pub const CANONICAL_SIZES: [u32; 6] = [32, 64, 128, 256, 512, 1024];

static MULTI_PAREN_STORAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\((\d+(?:\s*(?:GB|TB))?(?:\s+\d+(?:\s*(?:GB|TB))?)+)\)").expect("valid regex")
});
static PAREN_STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((\d+)\s*(GB|TB)\)").expect("valid regex"));
static BARE_STORAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*(GB|TB)").expect("valid regex"));
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

static BRACKET_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("valid regex"));
static GRADE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*grade\s*([a-z])\s*$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Storage parsed from a label; first matching rule wins.
///
/// 1. two or more sizes inside one pair of parentheses (`(64 256)`)
/// 2. one parenthesized size with unit (`(128GB)`, `(1TB)`)
/// 3. a bare size with unit anywhere (`128GB`, `1 TB`)
/// 4. bare canonical sizes among the whitespace tokens, implied GB
pub fn extract_storage(label: &str) -> Option<StorageSpec> {
    if let Some(caps) = MULTI_PAREN_STORAGE.captures(label) {
        let sizes = DIGITS
            .find_iter(&caps[1])
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .collect::<Vec<_>>();
        if sizes.len() > 1 {
            return Some(StorageSpec::multiple(sizes));
        }
    }

    if let Some(spec) = sized_capture(&PAREN_STORAGE, label) {
        return Some(spec);
    }
    if let Some(spec) = sized_capture(&BARE_STORAGE, label) {
        return Some(spec);
    }

    implied_storage(label)
}

fn sized_capture(re: &Regex, label: &str) -> Option<StorageSpec> {
    let caps = re.captures(label)?;
    let size = caps[1].parse::<u32>().ok()?;
    let unit = StorageUnit::parse(&caps[2])?;
    Some(StorageSpec::single(size, unit))
}

/// Fallback scan for labels that drop the unit (`"GALAXY A14 128 BLK"`).
/// A size glued to a color code (`"128BLK"`) counts too.
fn implied_storage(label: &str) -> Option<StorageSpec> {
    let mut sizes: Vec<u32> = Vec::new();
    for token in label.split_whitespace() {
        let digits_end = token.find(|c: char| !c.is_ascii_digit()).unwrap_or(token.len());
        if digits_end == 0 {
            continue;
        }
        let rest = &token[digits_end..];
        if !rest.is_empty() && color_alias(rest).is_none() {
            continue;
        }
        let Ok(size) = token[..digits_end].parse::<u32>() else {
            continue;
        };
        if CANONICAL_SIZES.contains(&size) && !sizes.contains(&size) {
            sizes.push(size);
        }
    }
    if sizes.is_empty() {
        None
    } else {
        Some(StorageSpec::multiple(sizes))
    }
}

// ---------------------------------------------------------------------------
// Quantity
// ---------------------------------------------------------------------------

/// Leading integer of a spreadsheet cell: `"3.0"` is 3, `"12 pcs"` is 12.
/// Negative, empty, or non-numeric text yields `None`.
pub fn parse_quantity(raw: &str) -> Option<u64> {
    let s = raw.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

// ---------------------------------------------------------------------------
// Grade
// ---------------------------------------------------------------------------

/// Grade from the first recognized bracket tag.
///
/// Only `Brand New`, `Open Box`, `Like New`, and `Grade A`/`Grade B` are
/// grades; `Grade C` and every other tag yield `None`.
pub fn extract_grade(label: &str) -> Option<GradeCode> {
    BRACKET_TAG
        .captures_iter(label)
        .find_map(|caps| grade_for_tag(&caps[1]))
}

fn grade_for_tag(tag: &str) -> Option<GradeCode> {
    match tag {
        "Brand New" => return Some(GradeCode::BrandNew),
        "Open Box" => return Some(GradeCode::OpenBox),
        "Like New" => return Some(GradeCode::LikeNew),
        _ => {}
    }
    let caps = GRADE_LETTER.captures(tag)?;
    match caps[1].to_ascii_uppercase().as_str() {
        "A" => Some(GradeCode::GradeA),
        "B" => Some(GradeCode::GradeB),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Black,
    Blue,
    Green,
    Grey,
    Purple,
    Pink,
    Gold,
    Silver,
    White,
    Cream,
    Yellow,
    Orange,
    Red,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Black => "black",
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Grey => "grey",
            Self::Purple => "purple",
            Self::Pink => "pink",
            Self::Gold => "gold",
            Self::Silver => "silver",
            Self::White => "white",
            Self::Cream => "cream",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
        };
        f.write_str(name)
    }
}

/// Distributor color spellings. An alias listed under two colors resolves
/// to the first.
const COLOR_ALIASES: &[(Color, &[&str])] = &[
    (
        Color::Black,
        &[
            "black", "blk", "blac", "cosmicblk", "electricblack", "fluidblk", "mdnblk", "mdnght",
            "mdnghtblack", "mdnghtblk", "mdntblk", "midnight", "midnightblack", "midntblk",
            "obsidian", "spblk", "sprkleblk", "crftdblk", "grphtblk", "glowingblck", "carbongrey",
        ],
    ),
    (
        Color::Blue,
        &[
            "blu", "blue", "iceblue", "icyblue", "navy", "saphrblue", "seablue", "sirblu",
            "skyblu", "slvblu", "cyanlake", "mdntgryblue",
        ],
    ),
    (
        Color::Green,
        &[
            "green", "grn", "mintgreen", "mintgrn", "mntgrn", "epigrn", "emraldgrn", "emrldgrn",
            "lghtgrn", "sagegrn", "olive",
        ],
    ),
    (
        Color::Grey,
        &[
            "grey", "gry", "granitegrey", "graphite", "grpht", "graphitegry", "onyxgry",
            "chrcoalgry", "hazelgrey", "lghtgry",
        ],
    ),
    (
        Color::Purple,
        &[
            "purple", "purpl", "ppl", "lavender", "lavndr", "vilet", "violet", "borapurple",
            "lvndr",
        ],
    ),
    (
        Color::Pink,
        &["pink", "pkgld", "pnkgld", "lilcpnk", "lavndrpink", "lvndrpink", "peach", "rose", "rosegold"],
    ),
    (Color::Gold, &["gold", "gld"]),
    (
        Color::Silver,
        &["silver", "silv", "slv", "slvr", "silvr", "ttnmslv", "crystlslv"],
    ),
    (
        Color::White,
        &["white", "wht", "whte", "frstdwht", "prsmwht", "starlight", "cloudywhte", "porcelain"],
    ),
    (Color::Cream, &["cream", "crem", "beige"]),
    (Color::Yellow, &["yellow", "yellw"]),
    (Color::Orange, &["orange", "ornge", "orangecopp"]),
    (Color::Red, &["red", "burgundy", "burgdy", "brz"]),
];

/// Resolve a single token (any case) to its canonical color.
pub fn color_alias(token: &str) -> Option<Color> {
    let token = token.to_ascii_lowercase();
    COLOR_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.contains(&token.as_str()))
        .map(|(color, _)| *color)
}

/// First color mentioned in a label. Tokens may carry a glued storage
/// prefix (`"256GRPHTBLK"`) or punctuation.
pub fn extract_color(label: &str) -> Option<Color> {
    label.split_whitespace().find_map(|raw| {
        let token = raw.trim_matches(|c: char| !c.is_ascii_alphanumeric());
        let token = token.trim_start_matches(|c: char| c.is_ascii_digit());
        if token.is_empty() {
            None
        } else {
            color_alias(token)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gb(size: u32) -> StorageSpec {
        StorageSpec::single(size, StorageUnit::Gb)
    }

    #[test]
    fn multi_value_parens() {
        let s = extract_storage("iPad Air (64 256) [Grade A]").unwrap();
        assert!(s.is_multiple);
        assert_eq!(s.sizes, vec![64, 256]);
        assert_eq!(s.unit, StorageUnit::Gb);
    }

    #[test]
    fn multi_value_parens_with_units() {
        let s = extract_storage("iPad Air (64GB 256GB)").unwrap();
        assert_eq!(s.sizes, vec![64, 256]);
    }

    #[test]
    fn single_paren_gb_and_tb() {
        assert_eq!(extract_storage("Galaxy S23 (256GB) [Brand New]"), Some(gb(256)));
        assert_eq!(
            extract_storage("iPad Pro (1TB)"),
            Some(StorageSpec::single(1, StorageUnit::Tb))
        );
    }

    #[test]
    fn paren_beats_bare() {
        // The parenthesized value is the disambiguated field.
        assert_eq!(extract_storage("Bundle 64GB promo (128GB)"), Some(gb(128)));
    }

    #[test]
    fn bare_with_unit() {
        assert_eq!(
            extract_storage("SAMSUNG GALAXY A54 5G SM-A546 128GB BLACK"),
            Some(gb(128))
        );
        assert_eq!(
            extract_storage("iPad Pro 2 TB Space Grey"),
            Some(StorageSpec::single(2, StorageUnit::Tb))
        );
    }

    #[test]
    fn implied_gb_from_canonical_number() {
        assert_eq!(extract_storage("GALAXY A14 128 BLK"), Some(gb(128)));
        assert_eq!(extract_storage("GALAXY A14 128BLK"), Some(gb(128)));
    }

    #[test]
    fn implied_ignores_non_canonical_numbers() {
        assert_eq!(extract_storage("iPhone 13 A2482 100"), None);
        assert_eq!(extract_storage("Galaxy S23"), None);
    }

    #[test]
    fn implied_multiple_bare_numbers() {
        let s = extract_storage("IPAD AIR 64 256 WIFI").unwrap();
        assert!(s.is_multiple);
        assert_eq!(s.sizes, vec![64, 256]);
    }

    #[test]
    fn quantity_leading_integer() {
        assert_eq!(parse_quantity("10"), Some(10));
        assert_eq!(parse_quantity(" 3.0 "), Some(3));
        assert_eq!(parse_quantity("12 pcs"), Some(12));
        assert_eq!(parse_quantity("+4"), Some(4));
    }

    #[test]
    fn quantity_rejects_negative_and_text() {
        assert_eq!(parse_quantity("-3"), None);
        assert_eq!(parse_quantity("n/a"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn grade_table() {
        assert_eq!(extract_grade("X [Brand New]"), Some(GradeCode::BrandNew));
        assert_eq!(extract_grade("X [Open Box]"), Some(GradeCode::OpenBox));
        assert_eq!(extract_grade("X [Like New]"), Some(GradeCode::LikeNew));
        assert_eq!(extract_grade("X [Grade A]"), Some(GradeCode::GradeA));
        assert_eq!(extract_grade("X [grade b]"), Some(GradeCode::GradeB));
    }

    #[test]
    fn grade_c_is_rejected() {
        assert_eq!(extract_grade("Galaxy S21 (128GB) [Grade C]"), None);
    }

    #[test]
    fn unknown_or_absent_tag() {
        assert_eq!(extract_grade("Galaxy S21 [Refurbished]"), None);
        assert_eq!(extract_grade("Galaxy S21 (128GB)"), None);
        assert_eq!(extract_grade(""), None);
    }

    #[test]
    fn first_recognized_tag_wins() {
        assert_eq!(extract_grade("Pixel 7 [Dual SIM] [Open Box]"), Some(GradeCode::OpenBox));
    }

    #[test]
    fn color_aliases() {
        assert_eq!(extract_color("GALAXY S23 256 GRPHTBLK"), Some(Color::Black));
        assert_eq!(extract_color("Galaxy A14 128 slvblu"), Some(Color::Blue));
        assert_eq!(extract_color("iPhone 13 128GB Starlight"), Some(Color::White));
        assert_eq!(extract_color("Galaxy A14 128PNKGLD"), Some(Color::Pink));
        assert_eq!(extract_color("Galaxy A14 128GB"), None);
    }
}

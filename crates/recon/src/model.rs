use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::extract::Color;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single normalized row from either source table.
///
/// Both the inventory export and the distributor list are coerced into this
/// shape at load time. Records are never mutated once matching starts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductRecord {
    /// Row position within its own source table.
    pub index: usize,
    pub label: String,
    pub model: Option<String>,
    pub product_id: Option<String>,
    pub quantity: u64,
    pub grade: Option<GradeCode>,
    pub raw_attributes: HashMap<String, String>,
}

impl ProductRecord {
    pub fn has_label(&self) -> bool {
        !self.label.trim().is_empty()
    }
}

/// Distributor rows plus the header order they were read with, so enriched
/// output can reproduce the original columns first.
#[derive(Debug, Clone, Default)]
pub struct DistributorTable {
    pub headers: Vec<String>,
    pub records: Vec<ProductRecord>,
}

/// Pre-loaded records for a single reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub inventory: Vec<ProductRecord>,
    pub distributor: DistributorTable,
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StorageUnit {
    #[serde(rename = "GB")]
    Gb,
    #[serde(rename = "TB")]
    Tb,
}

impl StorageUnit {
    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("gb") {
            Some(Self::Gb)
        } else if token.eq_ignore_ascii_case("tb") {
            Some(Self::Tb)
        } else {
            None
        }
    }
}

impl fmt::Display for StorageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gb => write!(f, "GB"),
            Self::Tb => write!(f, "TB"),
        }
    }
}

/// One or more capacities parsed from a label. `sizes` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StorageSpec {
    pub sizes: Vec<u32>,
    pub unit: StorageUnit,
    pub is_multiple: bool,
}

impl StorageSpec {
    pub fn single(size: u32, unit: StorageUnit) -> Self {
        Self { sizes: vec![size], unit, is_multiple: false }
    }

    /// Multi-capacity bundles are always expressed in GB.
    pub fn multiple(sizes: Vec<u32>) -> Self {
        let is_multiple = sizes.len() > 1;
        Self { sizes, unit: StorageUnit::Gb, is_multiple }
    }

    /// Bucket key: `"128"` for GB, `"1TB"` for TB, `"64,256"` for bundles.
    ///
    /// GB carries no suffix so an implied-GB value and an explicit one land
    /// in the same bucket.
    pub fn key(&self) -> String {
        if self.is_multiple {
            return self.sizes.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        }
        match self.unit {
            StorageUnit::Gb => self.sizes[0].to_string(),
            StorageUnit::Tb => format!("{}TB", self.sizes[0]),
        }
    }

    /// Lowercase `<size><unit>` tokens, e.g. `["128gb"]`.
    pub fn unit_tokens(&self) -> Vec<String> {
        let unit = self.unit.to_string().to_lowercase();
        self.sizes.iter().map(|s| format!("{s}{unit}")).collect()
    }
}

impl fmt::Display for StorageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sizes = self.sizes.iter().map(u32::to_string).collect::<Vec<_>>().join("/");
        write!(f, "{sizes}{}", self.unit)
    }
}

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GradeCode {
    #[serde(rename = "BN")]
    BrandNew,
    #[serde(rename = "GA")]
    GradeA,
    #[serde(rename = "GB")]
    GradeB,
    #[serde(rename = "OB")]
    OpenBox,
    #[serde(rename = "LN")]
    LikeNew,
}

impl GradeCode {
    /// Output order of the `Grade Counts` column.
    pub const ALL: [GradeCode; 5] = [
        Self::BrandNew,
        Self::GradeA,
        Self::GradeB,
        Self::OpenBox,
        Self::LikeNew,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::BrandNew => "BN",
            Self::GradeA => "GA",
            Self::GradeB => "GB",
            Self::OpenBox => "OB",
            Self::LikeNew => "LN",
        }
    }

    /// Loose interpretation of a distributor `Grade` column value.
    pub fn from_column(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "new" | "brand new" | "bn" => Some(Self::BrandNew),
            "a" | "grade a" | "ga" => Some(Self::GradeA),
            "b" | "grade b" | "gb" => Some(Self::GradeB),
            "open box" | "ob" => Some(Self::OpenBox),
            "like new" | "ln" => Some(Self::LikeNew),
            _ => None,
        }
    }
}

impl fmt::Display for GradeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Quantities bucketed by grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradeCounts([u64; 5]);

impl GradeCounts {
    /// Saturates at `u64::MAX` rather than overflowing.
    pub fn add(&mut self, grade: GradeCode, quantity: u64) {
        let count = &mut self.0[slot(grade)];
        *count = count.saturating_add(quantity);
    }

    pub fn get(&self, grade: GradeCode) -> u64 {
        self.0[slot(grade)]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, q| acc.saturating_add(*q))
    }
}

fn slot(grade: GradeCode) -> usize {
    match grade {
        GradeCode::BrandNew => 0,
        GradeCode::GradeA => 1,
        GradeCode::GradeB => 2,
        GradeCode::OpenBox => 3,
        GradeCode::LikeNew => 4,
    }
}

/// Renders `BN:<n>,GA:<n>,GB:<n>,OB:<n>,LN:<n>`; downstream exports parse
/// this exact string.
impl fmt::Display for GradeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, grade) in GradeCode::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", grade.code(), self.get(*grade))?;
        }
        Ok(())
    }
}

impl Serialize for GradeCounts {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(GradeCode::ALL.len()))?;
        for grade in GradeCode::ALL {
            map.serialize_entry(grade.code(), &self.get(grade))?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Model identity
// ---------------------------------------------------------------------------

/// Canonical device-family key, e.g. `"galaxy s23 ultra"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModelKey(String);

impl ModelKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelIdentity {
    pub model_key: Option<ModelKey>,
    pub storage: Option<StorageSpec>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Model,
    Name,
    Flexible,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Name => write!(f, "name"),
            Self::Flexible => write!(f, "flexible"),
        }
    }
}

/// Distributor rows claimed by one (model, storage), normalized name, or
/// flexible key, with the inventory stock that backs them.
#[derive(Debug, Clone, Serialize)]
pub struct MatchGroup {
    pub key: String,
    pub match_type: MatchType,
    /// Indices into the distributor table.
    pub member_indices: BTreeSet<usize>,
    /// Indices into the inventory table.
    pub source_indices: Vec<usize>,
    pub grade_counts: GradeCounts,
    pub total_quantity: u64,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconBucket {
    Model,
    Name,
    Flexible,
    NotMatched,
}

impl From<MatchType> for ReconBucket {
    fn from(t: MatchType) -> Self {
        match t {
            MatchType::Model => Self::Model,
            MatchType::Name => Self::Name,
            MatchType::Flexible => Self::Flexible,
        }
    }
}

impl fmt::Display for ReconBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Name => write!(f, "name"),
            Self::Flexible => write!(f, "flexible"),
            Self::NotMatched => write!(f, "not_matched"),
        }
    }
}

/// A distributor row with its reconciliation outcome attached.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRow {
    pub index: usize,
    pub product: String,
    pub fields: BTreeMap<String, String>,
    pub quantity: u64,
    pub bucket: ReconBucket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_key: Option<String>,
    pub matching_products: String,
    pub grade_counts: GradeCounts,
    /// Color named in the distributor label, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub distributor_rows: usize,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    pub groups: usize,
    pub total_quantity: u64,
    pub by_match_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub groups: Vec<MatchGroup>,
    pub rows: Vec<EnrichedRow>,
}

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub inventory: InventorySource,
    #[serde(default)]
    pub descriptions: Option<DescriptionSource>,
    pub distributor: DistributorSource,
    #[serde(default)]
    pub matching: MatchOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Source A: owned stock.
#[derive(Debug, Clone, Deserialize)]
pub struct InventorySource {
    pub file: String,
    #[serde(default)]
    pub columns: InventoryColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InventoryColumns {
    pub model: String,
    pub label: String,
    pub quantity: String,
    pub product_id: String,
}

impl Default for InventoryColumns {
    fn default() -> Self {
        Self {
            model: "model".into(),
            label: "name".into(),
            quantity: "quantity".into(),
            product_id: "product_id".into(),
        }
    }
}

/// Optional description table joined onto inventory rows by product id.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionSource {
    pub file: String,
    #[serde(default)]
    pub columns: DescriptionColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DescriptionColumns {
    pub product_id: String,
    pub label: String,
}

impl Default for DescriptionColumns {
    fn default() -> Self {
        Self {
            product_id: "product_id".into(),
            label: "name".into(),
        }
    }
}

/// Source B: the distributor list.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributorSource {
    pub file: String,
    #[serde(default)]
    pub columns: DistributorColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistributorColumns {
    pub label: String,
    pub grade: String,
    pub quantity: String,
}

impl Default for DistributorColumns {
    fn default() -> Self {
        Self {
            label: "Product".into(),
            grade: "Grade".into(),
            quantity: "Qty".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Engine-facing knobs of the three passes. The model pass always runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub name_pass: bool,
    pub flexible_pass: bool,
    /// Model codes shorter than this are not used as join tokens.
    pub min_model_len: usize,
    pub flexible: FlexibleOptions,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            name_pass: true,
            flexible_pass: true,
            min_model_len: 4,
            flexible: FlexibleOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlexibleOptions {
    /// Substrings (case-insensitive) a distributor label must contain.
    pub brands: Vec<String>,
    /// Whole words that mark a label as an accessory or non-phone item.
    pub exclude_keywords: Vec<String>,
}

impl Default for FlexibleOptions {
    fn default() -> Self {
        Self {
            brands: vec!["samsung".into()],
            exclude_keywords: [
                "case", "cover", "protector", "pen", "stylus", "watch", "buds", "book",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        if self.distributor.columns.label.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "distributor.columns.label must not be empty".into(),
            ));
        }

        if self.descriptions.is_some() && self.inventory.columns.product_id.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "descriptions require inventory.columns.product_id".into(),
            ));
        }

        self.matching.validate()
    }
}

impl MatchOptions {
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.min_model_len == 0 {
            return Err(ReconError::ConfigValidation(
                "matching.min_model_len must be at least 1".into(),
            ));
        }

        if self.flexible_pass && self.flexible.brands.iter().all(|b| b.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "matching.flexible.brands must not be empty when flexible_pass is enabled".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "Phonebot vs Ingram"

[inventory]
file = "stock.csv"

[distributor]
file = "ingram.csv"
"#;

    const FULL: &str = r#"
name = "Three table"

[inventory]
file = "oc_product.csv"
[inventory.columns]
model    = "Model"
quantity = "Qty"

[descriptions]
file = "oc_product_description.csv"

[distributor]
file = "ingram.csv"
[distributor.columns]
label = "Description"

[matching]
name_pass     = false
min_model_len = 5
[matching.flexible]
brands           = ["samsung", "google"]
exclude_keywords = ["case"]

[output]
json = "out.json"
csv  = "out.csv"
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = ReconConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.name, "Phonebot vs Ingram");
        assert_eq!(config.inventory.columns.model, "model");
        assert_eq!(config.inventory.columns.label, "name");
        assert_eq!(config.distributor.columns.label, "Product");
        assert_eq!(config.distributor.columns.grade, "Grade");
        assert!(config.descriptions.is_none());
        assert!(config.matching.name_pass);
        assert!(config.matching.flexible_pass);
        assert_eq!(config.matching.min_model_len, 4);
        assert_eq!(config.matching.flexible.brands, vec!["samsung"]);
        assert!(config.output.json.is_none());
    }

    #[test]
    fn parse_full() {
        let config = ReconConfig::from_toml(FULL).unwrap();
        assert_eq!(config.inventory.columns.model, "Model");
        assert_eq!(config.inventory.columns.quantity, "Qty");
        assert_eq!(config.inventory.columns.label, "name");
        let desc = config.descriptions.unwrap();
        assert_eq!(desc.columns.product_id, "product_id");
        assert_eq!(config.distributor.columns.label, "Description");
        assert_eq!(config.distributor.columns.quantity, "Qty");
        assert!(!config.matching.name_pass);
        assert_eq!(config.matching.min_model_len, 5);
        assert_eq!(config.matching.flexible.exclude_keywords, vec!["case"]);
        assert_eq!(config.output.csv.as_deref(), Some("out.csv"));
    }

    #[test]
    fn reject_empty_name() {
        let input = MINIMAL.replace("Phonebot vs Ingram", " ");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
    }

    #[test]
    fn reject_missing_distributor() {
        let input = r#"
name = "x"
[inventory]
file = "stock.csv"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_empty_label_column() {
        let input = format!("{MINIMAL}[distributor.columns]\nlabel = \"\"\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("distributor.columns.label"));
    }

    #[test]
    fn reject_descriptions_without_product_id() {
        let input = r#"
name = "x"
[inventory]
file = "stock.csv"
[inventory.columns]
product_id = ""
[descriptions]
file = "desc.csv"
[distributor]
file = "ingram.csv"
"#;
        let err = ReconConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("product_id"));
    }

    #[test]
    fn reject_zero_min_model_len() {
        let input = format!("{MINIMAL}[matching]\nmin_model_len = 0\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("min_model_len"));
    }

    #[test]
    fn reject_flexible_pass_without_brands() {
        let input = format!("{MINIMAL}[matching.flexible]\nbrands = []\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("brands"));
    }

    #[test]
    fn empty_brands_allowed_when_flexible_pass_off() {
        let input = format!(
            "{MINIMAL}[matching]\nflexible_pass = false\n[matching.flexible]\nbrands = []\n"
        );
        assert!(ReconConfig::from_toml(&input).is_ok());
    }

    #[test]
    fn unknown_match_option_type_fails_parse() {
        let input = format!("{MINIMAL}[matching]\nname_pass = \"yes\"\n");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}

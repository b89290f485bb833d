use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty name, bad column mapping, etc.).
    ConfigValidation(String),
    /// Required columns absent from one source table.
    MissingColumns { source: String, columns: Vec<String> },
    /// A source table has no rows.
    EmptySource { source: String },
    /// Malformed CSV content.
    Csv { source: String, message: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumns { source, columns } => {
                let noun = if columns.len() == 1 { "column" } else { "columns" };
                write!(f, "source '{source}': missing {noun} {}", quote_list(columns))
            }
            Self::EmptySource { source } => write!(f, "source '{source}' has no rows"),
            Self::Csv { source, message } => write!(f, "source '{source}': CSV error: {message}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl ReconError {
    /// True for errors caused by the shape of the input tables rather than
    /// by the config or the environment.
    pub fn is_input_shape(&self) -> bool {
        matches!(self, Self::MissingColumns { .. } | Self::EmptySource { .. })
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|c| format!("'{c}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

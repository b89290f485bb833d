use std::collections::HashMap;

use log::{debug, warn};

use crate::classify::enrich_rows;
use crate::config::{DescriptionColumns, DistributorColumns, InventoryColumns, ReconConfig};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::extract::{extract_grade, parse_quantity};
use crate::matcher::reconcile;
use crate::model::{DistributorTable, GradeCode, ProductRecord, ReconInput, ReconMeta, ReconResult};

/// Run reconciliation per config. Returns groups, enriched rows and summary.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    if input.inventory.is_empty() {
        return Err(ReconError::EmptySource { source: "inventory".into() });
    }
    if input.distributor.records.is_empty() {
        return Err(ReconError::EmptySource { source: "distributor".into() });
    }

    let groups = reconcile(&input.inventory, &input.distributor, &config.matching);
    let rows = enrich_rows(&input.inventory, &input.distributor, &groups);
    let summary = compute_summary(&rows, &groups);

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        groups,
        rows,
    })
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

struct CsvTable {
    headers: Vec<String>,
    records: Vec<csv::StringRecord>,
}

impl CsvTable {
    fn read(source: &str, csv_data: &str) -> Result<Self, ReconError> {
        let csv_err = |e: csv::Error| ReconError::Csv {
            source: source.into(),
            message: e.to_string(),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        Ok(Self { headers, records })
    }

    /// Case-insensitive, whitespace-trimmed header lookup.
    fn column(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Indices of every required column, or one error naming all the
    /// missing ones.
    fn require(&self, source: &str, names: &[&str]) -> Result<Vec<usize>, ReconError> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column(name) {
                Some(i) => found.push(i),
                None => missing.push(name.trim().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(ReconError::MissingColumns { source: source.into(), columns: missing })
        }
    }

    fn raw_attributes(&self, record: &csv::StringRecord) -> HashMap<String, String> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), record.get(i).unwrap_or("").to_string()))
            .collect()
    }
}

fn cell<'r>(record: &'r csv::StringRecord, idx: Option<usize>) -> &'r str {
    idx.and_then(|i| record.get(i)).unwrap_or("").trim()
}

fn quantity_cell(source: &str, row: usize, raw: &str) -> u64 {
    match parse_quantity(raw) {
        Some(q) => q,
        None => {
            if !raw.is_empty() {
                warn!("{source} row {row}: quantity '{raw}' is not a non-negative integer, using 0");
            }
            0
        }
    }
}

fn model_cell(raw: &str) -> Option<String> {
    let model = raw.trim();
    if model.is_empty() {
        None
    } else {
        Some(model.to_uppercase())
    }
}

/// Load the inventory export (source A).
///
/// With `with_descriptions` the label is taken from the description table
/// later, so the label column is optional and `product_id` is required.
pub fn load_inventory_csv(
    csv_data: &str,
    columns: &InventoryColumns,
    with_descriptions: bool,
) -> Result<Vec<ProductRecord>, ReconError> {
    const SOURCE: &str = "inventory";
    let table = CsvTable::read(SOURCE, csv_data)?;

    let mut required = vec![columns.model.as_str(), columns.quantity.as_str()];
    if with_descriptions {
        required.push(columns.product_id.as_str());
    } else {
        required.push(columns.label.as_str());
    }
    table.require(SOURCE, &required)?;

    let model_idx = table.column(&columns.model);
    let qty_idx = table.column(&columns.quantity);
    let label_idx = table.column(&columns.label);
    let id_idx = table.column(&columns.product_id);

    let records = table
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let label = cell(record, label_idx).to_string();
            let product_id = Some(cell(record, id_idx)).filter(|s| !s.is_empty()).map(String::from);
            ProductRecord {
                index,
                grade: extract_grade(&label),
                label,
                model: model_cell(cell(record, model_idx)),
                product_id,
                quantity: quantity_cell(SOURCE, index, cell(record, qty_idx)),
                raw_attributes: table.raw_attributes(record),
            }
        })
        .collect::<Vec<_>>();

    debug!("{SOURCE}: loaded {} rows", records.len());
    Ok(records)
}

/// Load the description table: product id to label. The first non-empty
/// description of an id wins.
pub fn load_descriptions_csv(
    csv_data: &str,
    columns: &DescriptionColumns,
) -> Result<HashMap<String, String>, ReconError> {
    const SOURCE: &str = "descriptions";
    let table = CsvTable::read(SOURCE, csv_data)?;
    let idx = table.require(SOURCE, &[columns.product_id.as_str(), columns.label.as_str()])?;
    let (id_idx, label_idx) = (idx[0], idx[1]);

    let mut descriptions = HashMap::new();
    for record in &table.records {
        let id = cell(record, Some(id_idx));
        let label = cell(record, Some(label_idx));
        if id.is_empty() || label.is_empty() {
            continue;
        }
        descriptions.entry(id.to_string()).or_insert_with(|| label.to_string());
    }

    debug!("{SOURCE}: loaded {} descriptions", descriptions.len());
    Ok(descriptions)
}

/// Load the distributor list (source B), keeping its header order.
pub fn load_distributor_csv(
    csv_data: &str,
    columns: &DistributorColumns,
) -> Result<DistributorTable, ReconError> {
    const SOURCE: &str = "distributor";
    let table = CsvTable::read(SOURCE, csv_data)?;
    table.require(SOURCE, &[columns.label.as_str()])?;

    let label_idx = table.column(&columns.label);
    let grade_idx = table.column(&columns.grade);
    let qty_idx = table.column(&columns.quantity);

    let records = table
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let label = cell(record, label_idx).to_string();
            let grade = extract_grade(&label)
                .or_else(|| GradeCode::from_column(cell(record, grade_idx)));
            ProductRecord {
                index,
                grade,
                label,
                model: None,
                product_id: None,
                quantity: quantity_cell(SOURCE, index, cell(record, qty_idx)),
                raw_attributes: table.raw_attributes(record),
            }
        })
        .collect::<Vec<_>>();

    debug!("{SOURCE}: loaded {} rows", records.len());
    Ok(DistributorTable {
        headers: table.headers,
        records,
    })
}

/// Fill inventory labels from the description table by product id. The
/// grade is re-read from the new label.
pub fn join_descriptions(records: &mut [ProductRecord], descriptions: &HashMap<String, String>) {
    let mut joined = 0usize;
    for record in records.iter_mut() {
        let Some(label) = record.product_id.as_ref().and_then(|id| descriptions.get(id)) else {
            continue;
        };
        record.label = label.clone();
        record.grade = extract_grade(&record.label);
        joined += 1;
    }
    debug!("descriptions: joined {joined} of {} inventory rows", records.len());
}

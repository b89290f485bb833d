use std::collections::{BTreeMap, HashMap};

use crate::extract::extract_color;
use crate::model::{
    DistributorTable, EnrichedRow, GradeCounts, MatchGroup, ProductRecord, ReconBucket,
};

/// Columns appended after the distributor's own columns in enriched output.
pub const OUTPUT_COLUMNS: [&str; 4] = ["Quantity", "Match Type", "Matching Products", "Grade Counts"];

/// One enriched row per distributor row, in distributor order.
///
/// Rows no group claimed come back as `not_matched` with zero quantity, so
/// the result always has exactly as many rows as the distributor table.
pub fn enrich_rows(
    inventory: &[ProductRecord],
    distributor: &DistributorTable,
    groups: &[MatchGroup],
) -> Vec<EnrichedRow> {
    let owner: HashMap<usize, &MatchGroup> = groups
        .iter()
        .flat_map(|g| g.member_indices.iter().map(move |&i| (i, g)))
        .collect();

    distributor
        .records
        .iter()
        .map(|record| {
            let fields: BTreeMap<String, String> = record
                .raw_attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let color = extract_color(&record.label);

            match owner.get(&record.index) {
                Some(group) => EnrichedRow {
                    index: record.index,
                    product: record.label.clone(),
                    fields,
                    quantity: group.total_quantity,
                    bucket: ReconBucket::from(group.match_type),
                    group_key: Some(group.key.clone()),
                    matching_products: matching_products(inventory, &group.source_indices),
                    grade_counts: group.grade_counts,
                    color,
                },
                None => EnrichedRow {
                    index: record.index,
                    product: record.label.clone(),
                    fields,
                    quantity: 0,
                    bucket: ReconBucket::NotMatched,
                    group_key: None,
                    matching_products: String::new(),
                    grade_counts: GradeCounts::default(),
                    color,
                },
            }
        })
        .collect()
}

fn matching_products(inventory: &[ProductRecord], sources: &[usize]) -> String {
    sources
        .iter()
        .filter_map(|&i| inventory.get(i))
        .map(|r| r.label.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Values for one output line: the distributor columns in header order,
/// then [`OUTPUT_COLUMNS`].
pub fn output_values(row: &EnrichedRow, headers: &[String]) -> Vec<String> {
    let mut values: Vec<String> = headers
        .iter()
        .map(|h| row.fields.get(h).cloned().unwrap_or_default())
        .collect();
    values.push(row.quantity.to_string());
    values.push(row.bucket.to_string());
    values.push(row.matching_products.clone());
    values.push(row.grade_counts.to_string());
    values
}

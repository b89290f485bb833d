use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::extract::extract_storage;
use crate::model::{GradeCounts, ProductRecord, StorageSpec};
use crate::normalize::normalize;

/// Inventory rows sharing one model code and storage bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelBucket {
    pub model: String,
    pub storage: Option<StorageSpec>,
    pub sources: Vec<usize>,
}

impl ModelBucket {
    /// `"SM-A546 (128)"`, or the bare model when no storage was found.
    pub fn key(&self) -> String {
        match &self.storage {
            Some(storage) => format!("{} ({})", self.model, storage.key()),
            None => self.model.clone(),
        }
    }
}

/// Sum quantities per grade over the given inventory rows. Ungraded rows
/// contribute nothing; repeated products add up.
pub fn grade_counts(inventory: &[ProductRecord], indices: &[usize]) -> GradeCounts {
    indices
        .iter()
        .filter_map(|&i| inventory.get(i))
        .fold(GradeCounts::default(), |mut counts, record| {
            if let Some(grade) = record.grade {
                counts.add(grade, record.quantity);
            }
            counts
        })
}

/// Model code usable as a join token, upper-cased.
pub fn usable_model(record: &ProductRecord, min_model_len: usize) -> Option<String> {
    let model = record.model.as_deref()?.trim();
    if model.chars().count() < min_model_len || model.chars().any(char::is_whitespace) {
        return None;
    }
    Some(model.to_uppercase())
}

/// Group inventory rows by `(model, storage)` for the model pass.
pub fn model_buckets(inventory: &[ProductRecord], min_model_len: usize) -> BTreeMap<String, ModelBucket> {
    let mut buckets: BTreeMap<String, ModelBucket> = BTreeMap::new();

    for record in inventory {
        if !record.has_label() {
            debug!("inventory row {}: no label, skipped by model pass", record.index);
            continue;
        }
        let Some(model) = usable_model(record, min_model_len) else {
            debug!("inventory row {}: no usable model code", record.index);
            continue;
        };
        let bucket = ModelBucket {
            model,
            storage: extract_storage(&record.label),
            sources: Vec::new(),
        };
        buckets
            .entry(bucket.key())
            .or_insert(bucket)
            .sources
            .push(record.index);
    }

    buckets
}

/// Group inventory rows by normalized name for the name pass, leaving out
/// rows already resolved.
pub fn name_buckets(
    inventory: &[ProductRecord],
    resolved: &BTreeSet<usize>,
) -> BTreeMap<String, Vec<usize>> {
    let mut buckets: BTreeMap<String, Vec<usize>> = BTreeMap::new();

    for record in inventory {
        if resolved.contains(&record.index) {
            continue;
        }
        let name = normalize(&record.label);
        if name.is_empty() {
            debug!("inventory row {}: empty normalized name", record.index);
            continue;
        }
        buckets.entry(name).or_default().push(record.index);
    }

    buckets
}

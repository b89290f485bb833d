//! The three matching passes.
//!
//! Each pass is a function from the current [`PassState`] to the next one.
//! Passes run strictly in sequence and a distributor row claimed by one
//! group is invisible to every later group and pass.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use log::{debug, trace};
use regex::Regex;

use crate::aggregate::{grade_counts, model_buckets, name_buckets, ModelBucket};
use crate::config::{FlexibleOptions, MatchOptions};
use crate::extract::extract_storage;
use crate::identify::identify;
use crate::model::{DistributorTable, MatchGroup, MatchType, ProductRecord, StorageSpec};
use crate::normalize::{name_variations, normalize};

static SAMSUNG_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SM-[A-Z0-9]+(?:/(?:DS|DSN))?").expect("valid regex"));

// ---------------------------------------------------------------------------
// Claim tracking
// ---------------------------------------------------------------------------

/// Distributor row indices already owned by an emitted group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet(BTreeSet<usize>);

impl ClaimSet {
    pub fn is_claimed(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    /// Claim every index. Returns false, claiming nothing, if any index is
    /// already owned.
    pub fn claim_all(&mut self, indices: &BTreeSet<usize>) -> bool {
        if indices.iter().any(|i| self.0.contains(i)) {
            return false;
        }
        self.0.extend(indices.iter().copied());
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PassState {
    pub claimed: ClaimSet,
    pub groups: Vec<MatchGroup>,
}

impl PassState {
    /// Claim the matched rows and emit the group if it has stock. A group
    /// with nothing to sell still keeps its rows from later passes, so they
    /// are reported as not matched.
    fn emit(
        &mut self,
        inventory: &[ProductRecord],
        key: String,
        match_type: MatchType,
        sources: Vec<usize>,
        members: BTreeSet<usize>,
    ) -> bool {
        if members.is_empty() || !self.claimed.claim_all(&members) {
            return false;
        }
        for index in &members {
            trace!("{match_type} pass: '{key}' claims distributor row {index}");
        }
        let counts = grade_counts(inventory, &sources);
        let total = counts.total();
        if total == 0 {
            debug!("{match_type} group '{key}': zero graded stock, not emitted");
            return false;
        }
        self.groups.push(MatchGroup {
            key,
            match_type,
            member_indices: members,
            source_indices: sources,
            grade_counts: counts,
            total_quantity: total,
        });
        true
    }

    fn count(&self, match_type: MatchType) -> usize {
        self.groups.iter().filter(|g| g.match_type == match_type).count()
    }
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

struct PassContext<'a> {
    inventory: &'a [ProductRecord],
    distributor: &'a [ProductRecord],
    options: &'a MatchOptions,
}

type Pass = fn(&PassContext<'_>, PassState) -> PassState;

const PASSES: [(MatchType, Pass); 3] = [
    (MatchType::Model, model_pass),
    (MatchType::Name, name_pass),
    (MatchType::Flexible, flexible_pass),
];

/// Match inventory against the distributor list.
///
/// Infallible: rows that cannot take part in a pass are skipped, and rows
/// no pass claims are simply absent from every group.
pub fn reconcile(
    inventory: &[ProductRecord],
    distributor: &DistributorTable,
    options: &MatchOptions,
) -> Vec<MatchGroup> {
    let ctx = PassContext {
        inventory,
        distributor: &distributor.records,
        options,
    };

    let state = PASSES
        .iter()
        .filter(|(match_type, _)| pass_enabled(options, *match_type))
        .fold(PassState::default(), |state, (match_type, pass)| {
            let before = state.claimed.len();
            let state = pass(&ctx, state);
            debug!(
                "{match_type} pass: {} groups, {} rows claimed ({} total of {})",
                state.count(*match_type),
                state.claimed.len() - before,
                state.claimed.len(),
                ctx.distributor.len()
            );
            state
        });

    state.groups
}

fn pass_enabled(options: &MatchOptions, match_type: MatchType) -> bool {
    match match_type {
        MatchType::Model => true,
        MatchType::Name => options.name_pass,
        MatchType::Flexible => options.flexible_pass,
    }
}

// ---------------------------------------------------------------------------
// Pass 1: model + storage
// ---------------------------------------------------------------------------

/// The part of a distributor label before the first `" -"` marketing suffix.
pub fn clean_distributor_label(label: &str) -> &str {
    label.split(" -").next().unwrap_or(label).trim()
}

struct ModelCandidate {
    cleaned: String,
    first_word: String,
    storage: Option<StorageSpec>,
}

fn model_pass(ctx: &PassContext<'_>, mut state: PassState) -> PassState {
    let candidates: Vec<Option<ModelCandidate>> = ctx
        .distributor
        .iter()
        .map(|row| {
            if !row.has_label() {
                return None;
            }
            let cleaned = clean_distributor_label(&row.label).to_uppercase();
            Some(ModelCandidate {
                first_word: cleaned.split(' ').next().unwrap_or_default().to_string(),
                storage: extract_storage(&cleaned),
                cleaned,
            })
        })
        .collect();

    // A bucket without storage accepts any storage, so it goes after the
    // storage-specific buckets of the same model.
    let mut buckets: Vec<(String, ModelBucket)> =
        model_buckets(ctx.inventory, ctx.options.min_model_len).into_iter().collect();
    buckets.sort_by(|(_, a), (_, b)| {
        a.model
            .cmp(&b.model)
            .then(a.storage.is_none().cmp(&b.storage.is_none()))
    });

    for (key, bucket) in buckets {
        let members: BTreeSet<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(i, _)| !state.claimed.is_claimed(*i))
            .filter_map(|(i, c)| c.as_ref().map(|c| (i, c)))
            .filter(|(_, c)| row_matches_bucket(&bucket, c))
            .map(|(i, _)| i)
            .collect();
        let ModelBucket { sources, .. } = bucket;
        state.emit(ctx.inventory, key, MatchType::Model, sources, members);
    }

    state
}

fn row_matches_bucket(bucket: &ModelBucket, candidate: &ModelCandidate) -> bool {
    if bucket.model == candidate.first_word {
        return false;
    }
    model_in_label(&bucket.model, &candidate.cleaned)
        && storage_matches(bucket.storage.as_ref(), candidate.storage.as_ref(), &candidate.cleaned)
}

/// Whether `model` occurs in the upper-cased `label` as a standalone token.
///
/// Samsung `SM-` codes are compared against the first `SM-` code in the
/// label instead, and must agree on the `/DS` or `/DSN` regional suffix.
pub fn model_in_label(model: &str, label: &str) -> bool {
    if model.starts_with("SM-") {
        let Some(code) = SAMSUNG_CODE.find(label) else {
            return false;
        };
        let (model_base, model_suffixed) = split_regional_suffix(model);
        let (code_base, code_suffixed) = split_regional_suffix(code.as_str());
        return model_suffixed == code_suffixed && model_base == code_base;
    }
    contains_token(label, model)
}

fn split_regional_suffix(code: &str) -> (&str, bool) {
    if let Some(base) = code.strip_suffix("/DSN") {
        (base, true)
    } else if let Some(base) = code.strip_suffix("/DS") {
        (base, true)
    } else {
        (code, false)
    }
}

fn contains_token(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        before.map_or(true, char::is_whitespace) && after.map_or(true, char::is_whitespace)
    })
}

/// Storage compatibility of a distributor row with an inventory bucket.
///
/// A bundle requirement (`64,256`) only needs every size to appear
/// somewhere in the distributor label; the distributor side may list more.
pub fn storage_matches(
    required: Option<&StorageSpec>,
    found: Option<&StorageSpec>,
    label: &str,
) -> bool {
    let Some(required) = required else {
        return true;
    };
    if required.is_multiple {
        return required.sizes.iter().all(|s| label.contains(&s.to_string()));
    }
    match (found, required.sizes.first()) {
        (Some(found), Some(size)) => found.unit == required.unit && found.sizes.contains(size),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Pass 2: normalized name prefix
// ---------------------------------------------------------------------------

fn name_pass(ctx: &PassContext<'_>, mut state: PassState) -> PassState {
    let resolved: BTreeSet<usize> = state
        .groups
        .iter()
        .filter(|g| g.match_type == MatchType::Model)
        .flat_map(|g| g.source_indices.iter().copied())
        .collect();

    let labels: Vec<Option<String>> = ctx
        .distributor
        .iter()
        .map(|row| row.has_label().then(|| normalize(&row.label).to_lowercase()))
        .collect();

    for (name, sources) in name_buckets(ctx.inventory, &resolved) {
        let variations: Vec<String> = name_variations(&name)
            .into_iter()
            .map(|v| v.to_lowercase())
            .collect();
        let members: BTreeSet<usize> = labels
            .iter()
            .enumerate()
            .filter(|(i, _)| !state.claimed.is_claimed(*i))
            .filter_map(|(i, label)| label.as_deref().map(|l| (i, l)))
            .filter(|(_, label)| variations.iter().any(|v| label.starts_with(v.as_str())))
            .map(|(i, _)| i)
            .collect();
        state.emit(ctx.inventory, name, MatchType::Name, sources, members);
    }

    state
}

// ---------------------------------------------------------------------------
// Pass 3: flexible, driven by the distributor label
// ---------------------------------------------------------------------------

/// Accessory denylist check. A keyword matches the start of a word, so
/// `buds` catches `Buds2` while `pen` leaves `Open` alone.
pub fn is_excluded(label: &str, options: &FlexibleOptions) -> bool {
    let keywords: Vec<String> = options
        .exclude_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|word| keywords.iter().any(|k| word.starts_with(k.as_str())))
}

fn has_brand(label: &str, options: &FlexibleOptions) -> bool {
    let lower = label.to_lowercase();
    options
        .brands
        .iter()
        .map(|b| b.trim().to_lowercase())
        .any(|b| !b.is_empty() && lower.contains(&b))
}

fn flexible_pass(ctx: &PassContext<'_>, mut state: PassState) -> PassState {
    let flexible = &ctx.options.flexible;

    for row in ctx.distributor {
        if state.claimed.is_claimed(row.index) || !row.has_label() {
            continue;
        }
        if !has_brand(&row.label, flexible) || is_excluded(&row.label, flexible) {
            continue;
        }
        let identity = identify(&row.label);
        let (Some(model_key), Some(storage)) = (identity.model_key, identity.storage) else {
            debug!("distributor row {}: no model key or storage for flexible pass", row.index);
            continue;
        };

        let needle = model_key.as_str();
        let tokens = storage.unit_tokens();
        let sources: Vec<usize> = ctx
            .inventory
            .iter()
            .filter(|r| r.has_label())
            .filter(|r| {
                let lower = r.label.to_lowercase();
                lower.contains(needle) && tokens.iter().all(|t| lower.contains(t.as_str()))
            })
            .filter(|r| !is_excluded(&r.label, flexible))
            .map(|r| r.index)
            .collect();

        state.emit(
            ctx.inventory,
            row.label.clone(),
            MatchType::Flexible,
            sources,
            BTreeSet::from([row.index]),
        );
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_grade;
    use crate::model::{GradeCode, StorageUnit};

    fn inv(index: usize, model: Option<&str>, label: &str, qty: u64) -> ProductRecord {
        ProductRecord {
            index,
            label: label.into(),
            model: model.map(String::from),
            quantity: qty,
            grade: extract_grade(label),
            ..Default::default()
        }
    }

    fn dist(labels: &[&str]) -> DistributorTable {
        DistributorTable {
            headers: vec!["Product".into()],
            records: labels
                .iter()
                .enumerate()
                .map(|(index, label)| ProductRecord {
                    index,
                    label: (*label).into(),
                    grade: Some(GradeCode::BrandNew),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn model_and_storage_match() {
        let inventory = vec![inv(0, Some("SM-A546"), "Galaxy A54 5G (128GB) [Brand New]", 10)];
        let distributor = dist(&["SAMSUNG GALAXY A54 5G SM-A546 128GB BLACK"]);
        let groups = reconcile(&inventory, &distributor, &MatchOptions::default());
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.match_type, MatchType::Model);
        assert_eq!(g.key, "SM-A546 (128)");
        assert_eq!(g.grade_counts.get(GradeCode::BrandNew), 10);
        assert_eq!(g.member_indices, BTreeSet::from([0]));
    }

    #[test]
    fn name_match_when_model_missing() {
        let inventory = vec![inv(0, None, "iPhone 13 Pro (256GB) [Grade A]", 3)];
        let distributor = dist(&["iPhone 13 Pro 256GB - Pristine"]);
        let groups = reconcile(&inventory, &distributor, &MatchOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].match_type, MatchType::Name);
        assert_eq!(groups[0].key, "iPhone 13 Pro 256");
        assert_eq!(groups[0].grade_counts.get(GradeCode::GradeA), 3);
    }

    #[test]
    fn accessory_never_claimed_by_flexible_pass() {
        let inventory = vec![inv(0, None, "Samsung Galaxy Buds Pro Case 128GB [Brand New]", 5)];
        let distributor = dist(&["Samsung Galaxy Buds Pro Case"]);
        let options = MatchOptions { name_pass: false, ..Default::default() };
        assert!(reconcile(&inventory, &distributor, &options).is_empty());
    }

    #[test]
    fn flexible_match_from_distributor_label() {
        let inventory = vec![inv(0, None, "Galaxy S23 Ultra 5G (512GB) [Open Box]", 2)];
        let distributor = dist(&["SAMSUNG GALAXY S23 ULTRA 5G 512GB PHANTOM BLACK"]);
        let groups = reconcile(&inventory, &distributor, &MatchOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].match_type, MatchType::Flexible);
        assert_eq!(groups[0].key, "SAMSUNG GALAXY S23 ULTRA 5G 512GB PHANTOM BLACK");
        assert_eq!(groups[0].grade_counts.get(GradeCode::OpenBox), 2);
    }

    #[test]
    fn flexible_pass_respects_toggle() {
        let inventory = vec![inv(0, None, "Galaxy S23 Ultra 5G (512GB) [Open Box]", 2)];
        let distributor = dist(&["SAMSUNG GALAXY S23 ULTRA 5G 512GB PHANTOM BLACK"]);
        let options = MatchOptions { flexible_pass: false, ..Default::default() };
        assert!(reconcile(&inventory, &distributor, &options).is_empty());
    }

    #[test]
    fn storage_mismatch_blocks_model_pass() {
        let inventory = vec![inv(0, Some("SM-A546"), "Galaxy A54 5G (256GB) [Brand New]", 10)];
        let distributor = dist(&["SAMSUNG GALAXY A54 5G SM-A546 128GB BLACK"]);
        let options = MatchOptions { name_pass: false, flexible_pass: false, ..Default::default() };
        assert!(reconcile(&inventory, &distributor, &options).is_empty());
    }

    #[test]
    fn zero_stock_group_keeps_row_from_later_passes() {
        let inventory = vec![
            inv(0, Some("SM-A546"), "Galaxy A54 5G (128GB) [Grade C]", 10),
            inv(1, None, "SAMSUNG GALAXY A54 [Like New]", 1),
        ];
        let distributor = dist(&["SAMSUNG GALAXY A54 5G SM-A546 128GB BLACK"]);
        let groups = reconcile(&inventory, &distributor, &MatchOptions::default());
        assert!(groups.is_empty());

        let rows = crate::classify::enrich_rows(&inventory, &distributor, &groups);
        assert_eq!(rows[0].bucket, crate::model::ReconBucket::NotMatched);
        assert_eq!(rows[0].quantity, 0);
    }

    #[test]
    fn storage_specific_bucket_claims_before_storage_less() {
        let inventory = vec![
            inv(0, Some("SM-A546"), "Galaxy A54 5G [Brand New]", 1),
            inv(1, Some("SM-A546"), "Galaxy A54 5G (128GB) [Brand New]", 50),
        ];
        let distributor = dist(&[
            "SAMSUNG GALAXY A54 5G SM-A546 128GB BLACK",
            "SAMSUNG GALAXY A54 5G SM-A546 256GB BLACK",
        ]);
        let groups = reconcile(&inventory, &distributor, &MatchOptions::default());
        let claiming: Vec<_> = groups.iter().filter(|g| g.member_indices.contains(&0)).collect();
        assert_eq!(claiming.len(), 1);
        assert_eq!(claiming[0].key, "SM-A546 (128)");
        assert_eq!(claiming[0].total_quantity, 50);

        // The storage-less bucket still takes what is left.
        let rest = groups.iter().find(|g| g.key == "SM-A546").unwrap();
        assert_eq!(rest.member_indices, BTreeSet::from([1]));
        assert_eq!(rest.total_quantity, 1);
    }

    #[test]
    fn flexible_match_at_64gb() {
        let inventory = vec![inv(0, None, "Galaxy A14 (64GB) [Brand New]", 3)];
        let distributor = dist(&["SAMSUNG GALAXY A14 64GB BLACK"]);
        let groups = reconcile(&inventory, &distributor, &MatchOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].match_type, MatchType::Flexible);
        assert_eq!(groups[0].total_quantity, 3);
    }

    #[test]
    fn regional_suffix_must_agree() {
        assert!(model_in_label("SM-A546", "SAMSUNG GALAXY A54 SM-A546 128GB"));
        assert!(!model_in_label("SM-A546", "SAMSUNG GALAXY A54 SM-A546/DS 128GB"));
        assert!(!model_in_label("SM-A546/DS", "SAMSUNG GALAXY A54 SM-A546 128GB"));
        assert!(model_in_label("SM-A546/DS", "SAMSUNG GALAXY A54 SM-A546/DSN 128GB"));
        assert!(!model_in_label("SM-A546", "SAMSUNG GALAXY A54 SM-A5460 128GB"));
    }

    #[test]
    fn plain_models_need_token_boundaries() {
        assert!(model_in_label("A2482", "IPHONE 13 A2482 128GB"));
        assert!(model_in_label("A2482", "A2482"));
        assert!(!model_in_label("A2482", "IPHONE 13 A24821 128GB"));
        assert!(!model_in_label("A2482", "IPHONE 13 XA2482"));
    }

    #[test]
    fn implied_and_explicit_gb_are_the_same_bucket() {
        let required = StorageSpec::single(128, StorageUnit::Gb);
        let implied = extract_storage("GALAXY A14 128 BLK");
        let explicit = extract_storage("GALAXY A14 128GB BLK");
        assert!(storage_matches(Some(&required), implied.as_ref(), "GALAXY A14 128 BLK"));
        assert!(storage_matches(Some(&required), explicit.as_ref(), "GALAXY A14 128GB BLK"));
    }

    #[test]
    fn tb_and_gb_do_not_cross_match() {
        let required = StorageSpec::single(1, StorageUnit::Tb);
        let gb = StorageSpec::single(1, StorageUnit::Gb);
        assert!(!storage_matches(Some(&required), Some(&gb), "X 1GB"));
    }

    #[test]
    fn bundle_requirement_is_asymmetric() {
        let required = StorageSpec::multiple(vec![64, 256]);
        assert!(storage_matches(Some(&required), None, "IPAD AIR 64 128 256"));
        assert!(!storage_matches(Some(&required), None, "IPAD AIR 64"));
    }

    #[test]
    fn no_requirement_matches_anything() {
        assert!(storage_matches(None, None, "X"));
    }

    #[test]
    fn denylist_matches_word_prefixes() {
        let options = FlexibleOptions::default();
        assert!(is_excluded("Galaxy S23 Clear Case", &options));
        assert!(is_excluded("Samsung Galaxy Buds2 Pro", &options));
        assert!(is_excluded("Samsung Galaxy Watch6 44mm", &options));
        assert!(is_excluded("Samsung Galaxy Book3 Pro 512GB", &options));
        assert!(!is_excluded("Galaxy S23 (128GB) [Open Box]", &options));
        assert!(!is_excluded("Galaxy S23 Ultra 256GB Phantom Black", &options));
    }

    #[test]
    fn clean_label_drops_suffix() {
        assert_eq!(clean_distributor_label("iPhone 13 - Pristine - AU"), "iPhone 13");
        assert_eq!(clean_distributor_label("Galaxy S23-Ultra"), "Galaxy S23-Ultra");
    }

    #[test]
    fn claim_all_is_atomic() {
        let mut claims = ClaimSet::default();
        assert!(claims.claim_all(&BTreeSet::from([1, 2])));
        assert!(!claims.claim_all(&BTreeSet::from([2, 3])));
        assert!(!claims.is_claimed(3));
        assert_eq!(claims.len(), 2);
    }
}

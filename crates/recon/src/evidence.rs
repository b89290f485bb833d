use std::collections::BTreeMap;

use crate::model::{EnrichedRow, MatchGroup, ReconBucket, ReconSummary};

/// Compute summary statistics from enriched rows and emitted groups.
pub fn compute_summary(rows: &[EnrichedRow], groups: &[MatchGroup]) -> ReconSummary {
    let mut by_match_type: BTreeMap<String, usize> = [
        ReconBucket::Model,
        ReconBucket::Name,
        ReconBucket::Flexible,
        ReconBucket::NotMatched,
    ]
    .iter()
    .map(|b| (b.to_string(), 0))
    .collect();

    for row in rows {
        *by_match_type.entry(row.bucket.to_string()).or_insert(0) += 1;
    }

    let unmatched_rows = rows
        .iter()
        .filter(|r| r.bucket == ReconBucket::NotMatched)
        .count();

    ReconSummary {
        distributor_rows: rows.len(),
        matched_rows: rows.len() - unmatched_rows,
        unmatched_rows,
        groups: groups.len(),
        total_quantity: groups.iter().map(|g| g.total_quantity).sum(),
        by_match_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GradeCounts, MatchType};
    use std::collections::BTreeSet;

    fn row(index: usize, bucket: ReconBucket, quantity: u64) -> EnrichedRow {
        EnrichedRow {
            index,
            product: format!("p{index}"),
            fields: BTreeMap::new(),
            quantity,
            bucket,
            group_key: None,
            matching_products: String::new(),
            grade_counts: GradeCounts::default(),
            color: None,
        }
    }

    fn group(match_type: MatchType, members: &[usize], total: u64) -> MatchGroup {
        MatchGroup {
            key: format!("{match_type}"),
            match_type,
            member_indices: members.iter().copied().collect::<BTreeSet<_>>(),
            source_indices: vec![0],
            grade_counts: GradeCounts::default(),
            total_quantity: total,
        }
    }

    #[test]
    fn counts_rows_per_bucket() {
        let rows = vec![
            row(0, ReconBucket::Model, 5),
            row(1, ReconBucket::Model, 5),
            row(2, ReconBucket::Name, 3),
            row(3, ReconBucket::NotMatched, 0),
        ];
        let groups = vec![group(MatchType::Model, &[0, 1], 5), group(MatchType::Name, &[2], 3)];
        let s = compute_summary(&rows, &groups);
        assert_eq!(s.distributor_rows, 4);
        assert_eq!(s.matched_rows, 3);
        assert_eq!(s.unmatched_rows, 1);
        assert_eq!(s.groups, 2);
        assert_eq!(s.total_quantity, 8);
        assert_eq!(s.by_match_type["model"], 2);
        assert_eq!(s.by_match_type["flexible"], 0);
        assert_eq!(s.by_match_type["not_matched"], 1);
    }

    #[test]
    fn empty_input() {
        let s = compute_summary(&[], &[]);
        assert_eq!(s.distributor_rows, 0);
        assert_eq!(s.by_match_type.len(), 4);
    }
}

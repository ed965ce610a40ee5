use std::collections::HashMap;

use canasta_core::{DedupStrategy, ProductRecord};

/// Collapses records sharing a dedup key.
///
/// The last occurrence of each key wins and stays at its own position, so
/// a listing repeated further down the page replaces the earlier copy.
#[must_use]
pub fn dedup_records(records: Vec<ProductRecord>, strategy: DedupStrategy) -> Vec<ProductRecord> {
    let mut last_index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        last_index.insert(record.dedup_key(strategy), i);
    }

    let before = records.len();
    let kept: Vec<ProductRecord> = records
        .into_iter()
        .enumerate()
        .filter(|(i, record)| last_index.get(&record.dedup_key(strategy)) == Some(i))
        .map(|(_, record)| record)
        .collect();

    if kept.len() < before {
        tracing::debug!(
            before,
            after = kept.len(),
            ?strategy,
            "dropped duplicate records"
        );
    }
    kept
}

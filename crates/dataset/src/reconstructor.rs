//! Merge per-kind samples into one timeline.

use std::collections::BTreeMap;

use contracts::{Dataset, DatasetRow, ExportLayout, SampleValues, SyncedSample, WideRow};

/// One row per sample, ascending by corrected timestamp
///
/// The sort is stable: rows sharing a timestamp keep the order in which
/// they were persisted.
pub fn reconstruct_long(samples: &[SyncedSample]) -> Vec<DatasetRow> {
    let mut rows: Vec<DatasetRow> = samples
        .iter()
        .map(|s| DatasetRow {
            timestamp_nanos: s.corrected_timestamp_nanos,
            source_timestamp_nanos: s.sample.timestamp_nanos(),
            kind: s.kind,
            values: SampleValues::from(&s.sample),
            synchronized: s.synchronized,
        })
        .collect();
    rows.sort_by_key(|r| r.timestamp_nanos);
    rows
}

/// One row per `bucket_nanos`-wide slot that holds at least one sample
///
/// Each row keeps the last value (in timestamp order) of every kind seen
/// inside the slot. Buckets are aligned to multiples of `bucket_nanos`.
pub fn reconstruct_wide(samples: &[SyncedSample], bucket_nanos: i64) -> Vec<WideRow> {
    let bucket_nanos = bucket_nanos.max(1);
    let mut buckets: BTreeMap<i64, WideRow> = BTreeMap::new();

    for row in reconstruct_long(samples) {
        // a bucket that would start below i64::MIN starts at i64::MIN
        let start = row
            .timestamp_nanos
            .saturating_sub(row.timestamp_nanos.rem_euclid(bucket_nanos));
        buckets
            .entry(start)
            .or_insert_with(|| WideRow {
                bucket_start_nanos: start,
                values: BTreeMap::new(),
            })
            .values
            .insert(row.kind, row.values);
    }

    buckets.into_values().collect()
}

/// Reconstruct in the requested layout
pub fn reconstruct(samples: &[SyncedSample], layout: ExportLayout, bucket_nanos: i64) -> Dataset {
    match layout {
        ExportLayout::Long => Dataset::Long(reconstruct_long(samples)),
        ExportLayout::Wide => Dataset::Wide {
            bucket_nanos,
            rows: reconstruct_wide(samples, bucket_nanos),
        },
    }
}

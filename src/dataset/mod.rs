//! Merges the viewport result set and the global search result set into the
//! one list the map renders, and keeps the id lookup over both.

pub mod fallback;
pub mod filter;

use crate::models::StationRecord;
use ahash::{AHashMap, AHashSet};
use fallback::{FetchMode, decide_mode};
use filter::StationFilter;
use std::sync::Arc;

/// Lookup by station id over every raw record the explorer currently holds.
///
/// Snapshots are immutable. Merging builds a new map and swaps the `Arc`, so a
/// clone handed out earlier never observes a partial update.
#[derive(Clone, Debug, Default)]
pub struct UnionIndex {
    records: Arc<AHashMap<String, StationRecord>>,
}

impl UnionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// New snapshot with `records` layered on top. Later ids overwrite.
    pub fn merged(&self, records: &[StationRecord]) -> UnionIndex {
        let mut map: AHashMap<String, StationRecord> = (*self.records).clone();
        for record in records {
            map.insert(record.id.clone(), record.clone());
        }

        UnionIndex {
            records: Arc::new(map),
        }
    }

    /// Viewport records first, then global search records, so the global copy
    /// wins on a shared id.
    pub fn from_sources(viewport: &[StationRecord], global: &[StationRecord]) -> UnionIndex {
        UnionIndex::new().merged(viewport).merged(global)
    }

    pub fn get(&self, id: &str) -> Option<&StationRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|id| id.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MergedView {
    pub mode: FetchMode,
    pub stations: Vec<StationRecord>,
}

/// Builds the rendered list.
///
/// `max_global` truncates the filtered global list when set.
pub fn merge_results(
    viewport: &[StationRecord],
    global: &[StationRecord],
    filter: &StationFilter,
    max_global: Option<usize>,
) -> MergedView {
    let local = filter.apply(viewport);
    let mode = decide_mode(&filter.query, local.len());

    let stations = match mode {
        FetchMode::Viewport => dedup_by_id(local),
        FetchMode::GlobalSearch => {
            let mut matches = dedup_by_id(filter.apply(global));

            if let Some(limit) = max_global {
                if matches.len() > limit {
                    tracing::warn!(
                        total = matches.len(),
                        limit,
                        "global search result list truncated"
                    );
                    matches.truncate(limit);
                }
            }

            matches
        }
    };

    MergedView { mode, stations }
}

fn dedup_by_id(records: Vec<StationRecord>) -> Vec<StationRecord> {
    let mut seen: AHashSet<String> = AHashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect()
}

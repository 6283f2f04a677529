use super::filter::SearchQuery;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchMode {
    Viewport,
    GlobalSearch,
}

/// Global search runs only when there is text to search for and nothing in
/// the current viewport matches it after filtering.
///
/// Recomputed on every query, filter or data change. Not debounced, the
/// viewport fetch underneath is.
pub fn should_global_search(query: &SearchQuery, locally_filtered_len: usize) -> bool {
    !query.is_empty() && locally_filtered_len == 0
}

pub fn decide_mode(query: &SearchQuery, locally_filtered_len: usize) -> FetchMode {
    if should_global_search(query, locally_filtered_len) {
        FetchMode::GlobalSearch
    } else {
        FetchMode::Viewport
    }
}

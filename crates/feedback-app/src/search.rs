//! Incremental text search over the log store

use feedback_core::SearchDirection;

use crate::log_store::LogStore;

/// Result of one search step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(u64),
    /// Found after wrapping around the end (or start) of the log
    Wrapped(u64),
    NotFound,
}

impl SearchOutcome {
    pub fn sequence(&self) -> Option<u64> {
        match self {
            SearchOutcome::Found(seq) | SearchOutcome::Wrapped(seq) => Some(*seq),
            SearchOutcome::NotFound => None,
        }
    }

    /// Short status text for the search bar
    pub fn display_status(&self) -> &'static str {
        match self {
            SearchOutcome::Found(_) => "✓",
            SearchOutcome::Wrapped(_) => "✓ (wrapped)",
            SearchOutcome::NotFound => "Not found",
        }
    }
}

/// Search query plus the cursor that next/previous move from
#[derive(Debug, Clone, Default)]
pub struct LogSearch {
    query: String,
    /// Sequence of the current match, 0 before the first hit
    cursor: u64,
    last: Option<SearchOutcome>,
}

impl LogSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the query. A different query restarts from the top.
    pub fn set_query(&mut self, query: &str) {
        if self.query != query {
            self.query = query.to_string();
            self.cursor = 0;
            self.last = None;
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn last_outcome(&self) -> Option<SearchOutcome> {
        self.last
    }

    /// Clear query and cursor
    pub fn clear(&mut self) {
        self.query.clear();
        self.cursor = 0;
        self.last = None;
    }

    /// Move to the next match (wraps around)
    pub fn next_match(&mut self, store: &LogStore) -> SearchOutcome {
        self.step(store, SearchDirection::Forward)
    }

    /// Move to the previous match (wraps around)
    pub fn prev_match(&mut self, store: &LogStore) -> SearchOutcome {
        self.step(store, SearchDirection::Backward)
    }

    fn step(&mut self, store: &LogStore, direction: SearchDirection) -> SearchOutcome {
        let outcome = match store.search(&self.query, self.cursor, direction) {
            Some(hit) if hit.wrapped => SearchOutcome::Wrapped(hit.sequence),
            Some(hit) => SearchOutcome::Found(hit.sequence),
            None => SearchOutcome::NotFound,
        };

        if let Some(seq) = outcome.sequence() {
            self.cursor = seq;
        }
        self.last = Some(outcome);
        outcome
    }

    /// Status of the last step, empty before any search
    pub fn display_status(&self) -> &'static str {
        self.last.map(|o| o.display_status()).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LogStore {
        let mut store = LogStore::new();
        store.append("compile main.rs\nwarning: unused\ncompile lib.rs\n");
        store
    }

    #[test]
    fn test_next_match_walks_and_wraps() {
        let store = store();
        let mut search = LogSearch::new();
        search.set_query("compile");

        assert_eq!(search.next_match(&store), SearchOutcome::Found(1));
        assert_eq!(search.next_match(&store), SearchOutcome::Found(3));
        assert_eq!(search.next_match(&store), SearchOutcome::Wrapped(1));
        assert_eq!(search.display_status(), "✓ (wrapped)");
    }

    #[test]
    fn test_prev_match_from_start_wraps_to_end() {
        let store = store();
        let mut search = LogSearch::new();
        search.set_query("compile");

        assert_eq!(search.prev_match(&store), SearchOutcome::Found(3));
        assert_eq!(search.prev_match(&store), SearchOutcome::Found(1));
        assert_eq!(search.prev_match(&store), SearchOutcome::Wrapped(3));
    }

    #[test]
    fn test_not_found_keeps_cursor() {
        let mut store = store();
        let mut search = LogSearch::new();
        search.set_query("warning");
        search.next_match(&store);
        assert_eq!(search.cursor(), 2);

        store.clear();
        assert_eq!(search.next_match(&store), SearchOutcome::NotFound);
        assert_eq!(search.cursor(), 2);
        assert_eq!(search.display_status(), "Not found");
    }

    #[test]
    fn test_new_query_resets_cursor() {
        let store = store();
        let mut search = LogSearch::new();
        search.set_query("compile");
        search.next_match(&store);
        search.next_match(&store);

        search.set_query("compile");
        assert_eq!(search.cursor(), 3);

        search.set_query("lib");
        assert_eq!(search.cursor(), 0);
        assert_eq!(search.display_status(), "");
    }

    #[test]
    fn test_clear() {
        let mut search = LogSearch::new();
        search.set_query("x");
        search.clear();
        assert!(search.query().is_empty());
        assert!(search.last_outcome().is_none());
    }
}

//! Ordered, classified buffer of captured output

use feedback_core::{highlight_as, LineTerminator, LogLevelFilter, LogLine, SearchDirection};

const LINE_NUMBER_STYLE: &str = "color: #95a5a6;";

/// A search hit and whether reaching it required wrapping around
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    pub sequence: u64,
    pub wrapped: bool,
}

/// Every line captured during a session, in arrival order
///
/// Sequence numbers are contiguous from 1. [`LogStore::clear`] resets the
/// counter so the next appended line is 1 again.
#[derive(Debug, Default)]
pub struct LogStore {
    lines: Vec<LogLine>,
    last_sequence: u64,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a chunk into lines, classify and append them.
    ///
    /// One trailing `\n` (or `\r\n`) is dropped, the rest is split on `\n`
    /// with blank lines kept. A `\r` before the split point becomes the
    /// line's terminator. An empty chunk appends nothing.
    pub fn append(&mut self, chunk: &str) -> &[LogLine] {
        let start = self.lines.len();
        if chunk.is_empty() {
            return &self.lines[start..];
        }

        let body = chunk.strip_suffix('\n').unwrap_or(chunk);
        for piece in body.split('\n') {
            let (raw, terminator) = match piece.strip_suffix('\r') {
                Some(raw) => (raw, LineTerminator::CrLf),
                None => (piece, LineTerminator::Lf),
            };
            self.last_sequence += 1;
            self.lines.push(LogLine::new(self.last_sequence, raw, terminator));
        }

        &self.lines[start..]
    }

    /// Drop every line and restart numbering
    pub fn clear(&mut self) {
        self.lines.clear();
        self.last_sequence = 0;
    }

    /// Lines visible under `filter`, in order
    pub fn filtered(&self, filter: LogLevelFilter) -> impl Iterator<Item = &LogLine> + '_ {
        self.lines
            .iter()
            .filter(move |line| filter.matches(line.level()))
    }

    /// Find the next line containing `text` (case-sensitive).
    ///
    /// Searches strictly after `from` going forward, or strictly before it
    /// going backward, then wraps once to the opposite end; the wrapped pass
    /// includes `from` itself. `from == 0` means no cursor yet.
    pub fn find(&self, text: &str, from: u64, direction: SearchDirection) -> Option<u64> {
        self.search(text, from, direction).map(|hit| hit.sequence)
    }

    /// Same as [`LogStore::find`], also reporting whether the search wrapped
    pub fn search(&self, text: &str, from: u64, direction: SearchDirection) -> Option<SearchHit> {
        if text.is_empty() || self.lines.is_empty() {
            return None;
        }

        let len = self.lines.len();
        let contains = |index: &usize| self.lines[*index].raw().contains(text);
        let hit = |index: usize, wrapped: bool| SearchHit {
            sequence: self.lines[index].sequence(),
            wrapped,
        };

        match direction {
            SearchDirection::Forward => {
                // Index of the first line after the cursor
                let pivot = usize::try_from(from).unwrap_or(usize::MAX).min(len);
                if let Some(index) = (pivot..len).find(contains) {
                    return Some(hit(index, false));
                }
                (0..pivot).find(contains).map(|index| hit(index, true))
            }
            SearchDirection::Backward => {
                // Index of the cursor line itself
                let pivot = match from {
                    0 => len,
                    from => usize::try_from(from - 1).unwrap_or(usize::MAX).min(len),
                };
                if let Some(index) = (0..pivot).rev().find(contains) {
                    return Some(hit(index, false));
                }
                (pivot..len).rev().find(contains).map(|index| hit(index, true))
            }
        }
    }

    /// Raw text of every line, each followed by its own terminator
    pub fn export_text(&self) -> String {
        lines_text(&self.lines)
    }

    /// Highlighted HTML for each line visible under `filter`
    pub fn render_html(
        &self,
        filter: LogLevelFilter,
        show_line_numbers: bool,
    ) -> impl Iterator<Item = String> + '_ {
        self.filtered(filter).map(move |line| {
            let body = highlight_as(line.raw(), line.level());
            if show_line_numbers {
                format!(
                    r#"<span style="{LINE_NUMBER_STYLE}">{:4} | </span>{body}"#,
                    line.sequence()
                )
            } else {
                body
            }
        })
    }

    /// Line with the given sequence number
    pub fn get(&self, sequence: u64) -> Option<&LogLine> {
        let index = usize::try_from(sequence.checked_sub(1)?).ok()?;
        self.lines.get(index)
    }

    /// Lines from `sequence` (inclusive) to the end
    pub fn since(&self, sequence: u64) -> &[LogLine] {
        let index = usize::try_from(sequence.saturating_sub(1))
            .unwrap_or(usize::MAX)
            .min(self.lines.len());
        &self.lines[index..]
    }

    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sequence number of the newest line, 0 when empty
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

/// Join lines back into text using their original terminators
pub fn lines_text(lines: &[LogLine]) -> String {
    let mut text = String::with_capacity(lines.iter().map(|l| l.raw().len() + 2).sum());
    for line in lines {
        text.push_str(line.raw());
        text.push_str(line.terminator().as_str());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedback_core::LogLevel;

    fn store_with(lines: &[&str]) -> LogStore {
        let mut store = LogStore::new();
        for line in lines {
            store.append(&format!("{line}\n"));
        }
        store
    }

    fn sequences(store: &LogStore) -> Vec<u64> {
        store.lines().iter().map(LogLine::sequence).collect()
    }

    #[test]
    fn test_append_assigns_contiguous_sequences() {
        let mut store = LogStore::new();
        store.append("one\ntwo\n");
        store.append("three\n");
        assert_eq!(sequences(&store), vec![1, 2, 3]);
        assert_eq!(store.last_sequence(), 3);
    }

    #[test]
    fn test_append_returns_new_lines() {
        let mut store = store_with(&["first"]);
        let appended: Vec<String> = store
            .append("a\nb\n")
            .iter()
            .map(|l| l.raw().to_string())
            .collect();
        assert_eq!(appended, vec!["a", "b"]);
    }

    #[test]
    fn test_append_strips_exactly_one_newline() {
        let mut store = LogStore::new();
        store.append("a\n\n");
        let raws: Vec<&str> = store.lines().iter().map(LogLine::raw).collect();
        assert_eq!(raws, vec!["a", ""]);
    }

    #[test]
    fn test_append_keeps_embedded_blank_lines() {
        let mut store = LogStore::new();
        store.append("\nProcess exited with code 0\n");
        let raws: Vec<&str> = store.lines().iter().map(LogLine::raw).collect();
        assert_eq!(raws, vec!["", "Process exited with code 0"]);
    }

    #[test]
    fn test_append_empty_chunk_is_noop() {
        let mut store = LogStore::new();
        assert!(store.append("").is_empty());
        assert!(store.is_empty());
        assert_eq!(store.last_sequence(), 0);
    }

    #[test]
    fn test_append_blank_line_chunk() {
        let mut store = LogStore::new();
        store.append("\n");
        assert_eq!(store.len(), 1);
        assert_eq!(store.lines()[0].raw(), "");
    }

    #[test]
    fn test_append_crlf_preserved_in_export() {
        let mut store = LogStore::new();
        store.append("dos line\r\n");
        store.append("unix line\n");
        assert_eq!(store.lines()[0].raw(), "dos line");
        assert_eq!(store.lines()[0].terminator(), LineTerminator::CrLf);
        assert_eq!(store.export_text(), "dos line\r\nunix line\n");
    }

    #[test]
    fn test_append_classifies() {
        let store = store_with(&["ERROR boom", "ok"]);
        assert_eq!(store.lines()[0].level(), LogLevel::Error);
        assert_eq!(store.lines()[1].level(), LogLevel::Other);
    }

    #[test]
    fn test_clear_resets_numbering() {
        let mut store = store_with(&["a", "b"]);
        store.clear();
        assert!(store.is_empty());
        store.append("c\n");
        assert_eq!(sequences(&store), vec![1]);
    }

    #[test]
    fn test_filtered_keeps_other_lines() {
        let store = store_with(&["error: x", "info: y", "plain", "warning: z"]);
        let raws: Vec<&str> = store
            .filtered(LogLevelFilter::Error)
            .map(LogLine::raw)
            .collect();
        assert_eq!(raws, vec!["error: x", "plain"]);
        assert_eq!(store.filtered(LogLevelFilter::All).count(), 4);
    }

    #[test]
    fn test_find_forward_wraps_to_start() {
        let store = store_with(&["foo", "bar", "foo"]);
        assert_eq!(store.find("foo", 3, SearchDirection::Forward), Some(1));
        assert_eq!(store.find("foo", 1, SearchDirection::Forward), Some(3));
    }

    #[test]
    fn test_find_forward_without_cursor_starts_at_top() {
        let store = store_with(&["foo", "bar", "foo"]);
        assert_eq!(store.find("foo", 0, SearchDirection::Forward), Some(1));
        assert_eq!(store.find("bar", 0, SearchDirection::Forward), Some(2));
    }

    #[test]
    fn test_find_backward_wraps_to_end() {
        let store = store_with(&["foo", "bar", "foo"]);
        assert_eq!(store.find("foo", 3, SearchDirection::Backward), Some(1));
        assert_eq!(store.find("foo", 1, SearchDirection::Backward), Some(3));
        assert_eq!(store.find("foo", 0, SearchDirection::Backward), Some(3));
    }

    #[test]
    fn test_find_wrap_includes_cursor_line() {
        let store = store_with(&["only match", "other"]);
        let hit = store.search("match", 1, SearchDirection::Forward).unwrap();
        assert_eq!(hit, SearchHit { sequence: 1, wrapped: true });

        let hit = store.search("match", 1, SearchDirection::Backward).unwrap();
        assert_eq!(hit, SearchHit { sequence: 1, wrapped: true });
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let store = store_with(&["Foo"]);
        assert_eq!(store.find("foo", 0, SearchDirection::Forward), None);
    }

    #[test]
    fn test_find_empty_text_or_store() {
        let store = store_with(&["foo"]);
        assert_eq!(store.find("", 0, SearchDirection::Forward), None);
        assert_eq!(LogStore::new().find("foo", 0, SearchDirection::Forward), None);
    }

    #[test]
    fn test_find_with_stale_cursor() {
        let store = store_with(&["foo", "bar"]);
        assert_eq!(store.find("bar", 10, SearchDirection::Forward), Some(2));
        assert_eq!(store.find("foo", 10, SearchDirection::Backward), Some(1));
    }

    #[test]
    fn test_export_round_trips() {
        let text = "$ cargo test\nrunning 3 tests\n\ntest result: ok\n";
        let mut store = LogStore::new();
        store.append(text);
        assert_eq!(store.export_text(), text);
    }

    #[test]
    fn test_render_html_line_numbers() {
        let store = store_with(&["a < b", "error: x"]);
        let html: Vec<String> = store.render_html(LogLevelFilter::All, true).collect();
        assert_eq!(
            html[0],
            r#"<span style="color: #95a5a6;">   1 | </span>a &lt; b"#
        );
        assert!(html[1].starts_with(r#"<span style="color: #95a5a6;">   2 | </span><span"#));
    }

    #[test]
    fn test_render_html_respects_filter() {
        let store = store_with(&["error: x", "warning: y"]);
        let html: Vec<String> = store.render_html(LogLevelFilter::Warning, false).collect();
        assert_eq!(html.len(), 1);
        assert!(html[0].contains("warning: y"));
    }

    #[test]
    fn test_get_and_since() {
        let store = store_with(&["a", "b", "c"]);
        assert_eq!(store.get(2).map(LogLine::raw), Some("b"));
        assert!(store.get(0).is_none());
        assert!(store.get(4).is_none());
        assert_eq!(lines_text(store.since(2)), "b\nc\n");
        assert!(store.since(9).is_empty());
    }
}

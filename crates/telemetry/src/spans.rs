use std::collections::HashMap;

use uxlab_core_types::SpanId;

struct ActiveSpan {
    name: String,
    started_at: u64,
}

/// Outcome of resolving an end call against the open spans.
pub struct ResolvedEnd {
    pub id: SpanId,
    pub name: String,
    /// Present only when the close matched an open span.
    pub duration_ms: Option<u64>,
}

/// Bookkeeping for logically overlapping named task spans within one page
/// load. Spans are in-memory only; their start/end events are what persists.
#[derive(Default)]
pub struct SpanTracker {
    active: HashMap<SpanId, ActiveSpan>,
    // Insertion order of currently open spans, oldest first.
    order: Vec<SpanId>,
}

impl SpanTracker {
    pub fn start(&mut self, name: &str, now_ms: u64) -> SpanId {
        let id = SpanId::new();
        self.active.insert(
            id.clone(),
            ActiveSpan {
                name: name.to_string(),
                started_at: now_ms,
            },
        );
        self.order.push(id.clone());
        id
    }

    /// Resolves `name_or_id`: an exact open-span id wins; otherwise the most
    /// recently started open span with that name (stack semantics, so nested
    /// same-named tasks close innermost first); otherwise a fresh id with no
    /// duration. An unmatched close is not an error.
    pub fn resolve_end(&mut self, name_or_id: &str, now_ms: u64) -> ResolvedEnd {
        let key = SpanId(name_or_id.to_string());
        let resolved = if self.active.contains_key(&key) {
            Some(key)
        } else {
            self.order
                .iter()
                .rev()
                .find(|id| {
                    self.active
                        .get(*id)
                        .map(|span| span.name == name_or_id)
                        .unwrap_or(false)
                })
                .cloned()
        };

        match resolved {
            Some(id) => {
                let span = self.remove(&id);
                match span {
                    Some(span) => ResolvedEnd {
                        id,
                        name: span.name,
                        duration_ms: Some(now_ms.saturating_sub(span.started_at)),
                    },
                    None => ResolvedEnd {
                        id,
                        name: name_or_id.to_string(),
                        duration_ms: None,
                    },
                }
            }
            None => ResolvedEnd {
                id: SpanId::new(),
                name: name_or_id.to_string(),
                duration_ms: None,
            },
        }
    }

    fn remove(&mut self, id: &SpanId) -> Option<ActiveSpan> {
        self.order.retain(|open| open != id);
        self.active.remove(id)
    }

    pub fn open_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_open(&self, id: &SpanId) -> bool {
        self.active.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_by_id_beats_name_lookup() {
        let mut tracker = SpanTracker::default();
        let first = tracker.start("x", 100);
        let _second = tracker.start("x", 200);
        let end = tracker.resolve_end(&first.0, 250);
        assert_eq!(end.id, first);
        assert_eq!(end.duration_ms, Some(150));
        assert_eq!(tracker.open_count(), 1);
    }

    #[test]
    fn same_named_spans_close_newest_first() {
        let mut tracker = SpanTracker::default();
        let a1 = tracker.start("x", 100);
        let b = tracker.start("y", 150);
        let a2 = tracker.start("x", 200);

        let first_close = tracker.resolve_end("x", 300);
        assert_eq!(first_close.id, a2);
        assert_eq!(first_close.duration_ms, Some(100));

        let second_close = tracker.resolve_end("x", 400);
        assert_eq!(second_close.id, a1);
        assert_eq!(second_close.duration_ms, Some(300));

        assert!(tracker.is_open(&b));
        assert_eq!(tracker.open_count(), 1);
    }

    #[test]
    fn unmatched_end_synthesizes_id_without_duration() {
        let mut tracker = SpanTracker::default();
        let end = tracker.resolve_end("never-started", 500);
        assert_eq!(end.name, "never-started");
        assert!(end.duration_ms.is_none());
        assert_eq!(tracker.open_count(), 0);
    }

    #[test]
    fn closed_spans_stop_resolving() {
        let mut tracker = SpanTracker::default();
        let id = tracker.start("login", 100);
        let end = tracker.resolve_end("login", 350);
        assert_eq!(end.id, id);
        assert_eq!(end.duration_ms, Some(250));

        let again = tracker.resolve_end("login", 400);
        assert_ne!(again.id, id);
        assert!(again.duration_ms.is_none());
    }
}

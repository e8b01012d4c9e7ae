//! The strategy cascade plumbing.
//!
//! Each extraction domain (price, stock) defines concrete strategies that
//! probe one kind of evidence. The dispatcher runs them in a fixed
//! precedence order; the first non-`None` result wins, and every strategy's
//! notes are kept for the snapshot's diagnostic trail.

use serde_json::Value;

use crate::dom::Dom;

/// Everything a strategy may look at. Built once per snapshot and shared
/// across all cascades.
pub struct ExtractionContext<'a> {
    pub dom: &'a Dom,
    pub json_blobs: &'a [Value],
    /// The raw (unstripped) document, for whole-text heuristics.
    pub html: &'a str,
}

/// One strategy's output: an optional result plus diagnostics.
pub struct StrategyOutcome<T> {
    pub result: Option<T>,
    pub notes: Vec<String>,
}

impl<T> StrategyOutcome<T> {
    /// A miss with one explanatory note.
    #[must_use]
    pub fn miss(note: impl Into<String>) -> Self {
        Self {
            result: None,
            notes: vec![note.into()],
        }
    }

    /// A hit with one explanatory note.
    #[must_use]
    pub fn hit(value: T, note: impl Into<String>) -> Self {
        Self {
            result: Some(value),
            notes: vec![note.into()],
        }
    }
}

/// A single pluggable extraction strategy.
pub trait Strategy<T>: Sync {
    /// Stable name surfaced in result metadata and notes.
    fn name(&self) -> &'static str;

    fn extract(&self, ctx: &ExtractionContext<'_>) -> StrategyOutcome<T>;
}

/// The winning value and which strategy produced it.
pub struct CascadeHit<T> {
    pub value: T,
    pub strategy: &'static str,
}

/// Run `strategies` in order; first non-`None` result wins. All notes are
/// appended to `notes`, prefixed with the producing strategy's name.
pub fn run_cascade<T>(
    strategies: &[&dyn Strategy<T>],
    ctx: &ExtractionContext<'_>,
    notes: &mut Vec<String>,
) -> Option<CascadeHit<T>> {
    for strategy in strategies {
        let outcome = strategy.extract(ctx);
        notes.extend(
            outcome
                .notes
                .into_iter()
                .map(|n| format!("{}: {n}", strategy.name())),
        );
        if let Some(value) = outcome.result {
            return Some(CascadeHit {
                value,
                strategy: strategy.name(),
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        value: Option<u32>,
    }

    impl Strategy<u32> for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn extract(&self, _ctx: &ExtractionContext<'_>) -> StrategyOutcome<u32> {
            match self.value {
                Some(v) => StrategyOutcome::hit(v, "hit"),
                None => StrategyOutcome::miss("miss"),
            }
        }
    }

    fn empty_ctx(dom: &Dom) -> ExtractionContext<'_> {
        ExtractionContext {
            dom,
            json_blobs: &[],
            html: "",
        }
    }

    #[test]
    fn first_non_null_result_wins() {
        let dom = Dom::parse("");
        let a = Fixed { name: "a", value: None };
        let b = Fixed { name: "b", value: Some(7) };
        let c = Fixed { name: "c", value: Some(9) };

        let mut notes = Vec::new();
        let hit = run_cascade(&[&a, &b, &c], &empty_ctx(&dom), &mut notes).expect("hit");
        assert_eq!(hit.value, 7);
        assert_eq!(hit.strategy, "b");
    }

    #[test]
    fn later_strategies_do_not_run_after_a_hit() {
        let dom = Dom::parse("");
        let a = Fixed { name: "a", value: Some(1) };
        let b = Fixed { name: "b", value: Some(2) };

        let mut notes = Vec::new();
        run_cascade(&[&a, &b], &empty_ctx(&dom), &mut notes);
        assert_eq!(notes, vec!["a: hit"]);
    }

    #[test]
    fn all_misses_keep_all_notes() {
        let dom = Dom::parse("");
        let a = Fixed { name: "a", value: None };
        let b = Fixed { name: "b", value: None };

        let mut notes = Vec::new();
        let hit = run_cascade(&[&a, &b], &empty_ctx(&dom), &mut notes);
        assert!(hit.is_none());
        assert_eq!(notes, vec!["a: miss", "b: miss"]);
    }
}

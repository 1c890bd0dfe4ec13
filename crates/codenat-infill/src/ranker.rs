//! Candidate names from masked-model predictions.

use crate::filter::is_suitable;
use codenat_common::Result;
use codenat_oracle::{MaskPredictions, MaskedLmOracle, Prediction};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Turn oracle output into at most `limit` suitable, distinct names.
///
/// A flat list is taken in the oracle's order. Per-position lists are
/// merged first: each surface string scores the sum of its scores across
/// positions, and strings are ranked by that sum (ties keep first-seen
/// order). Unsuitable strings never take up a place.
pub fn select_candidates(
    predictions: &MaskPredictions,
    existing: &HashSet<String>,
    limit: usize,
) -> Vec<String> {
    let ordered: Vec<&str> = match predictions {
        MaskPredictions::Flat(list) => list.iter().map(Prediction::surface).collect(),
        MaskPredictions::Nested(positions) => aggregate(positions),
    };

    let mut selected: Vec<String> = Vec::with_capacity(limit);
    for surface in ordered {
        if selected.len() == limit {
            break;
        }
        if !selected.iter().any(|s| s == surface) && is_suitable(surface, existing) {
            selected.push(surface.to_string());
        }
    }
    selected
}

fn aggregate(positions: &[Vec<Prediction>]) -> Vec<&str> {
    let mut totals: Vec<(&str, f64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for prediction in positions.iter().flatten() {
        let surface = prediction.surface();
        match index.get(surface) {
            Some(&i) => totals[i].1 += prediction.score,
            None => {
                index.insert(surface, totals.len());
                totals.push((surface, prediction.score));
            }
        }
    }
    // NaN sums rank last, in first-seen order.
    totals.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (false, false) => b.1.total_cmp(&a.1),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });
    totals.into_iter().map(|(surface, _)| surface).collect()
}

/// Ranks names for one slot by querying a masked-model oracle.
pub struct CandidateRanker<O> {
    oracle: O,
    limit: usize,
}

impl<O: MaskedLmOracle> CandidateRanker<O> {
    /// `limit` bounds the list returned per slot.
    pub fn new(oracle: O, limit: usize) -> Self {
        Self { oracle, limit }
    }

    /// Ranked, deduplicated, suitable candidates for the mask in `context`.
    pub fn rank(&self, context: &str, existing: &HashSet<String>) -> Result<Vec<String>> {
        let predictions = self.oracle.fill_mask(context)?;
        let candidates = select_candidates(&predictions, existing, self.limit);
        debug!(
            positions = predictions.positions(),
            candidates = ?candidates,
            "ranked slot candidates"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codenat_common::PipelineError;

    fn flat(items: &[(&str, f64)]) -> MaskPredictions {
        MaskPredictions::Flat(items.iter().map(|(s, p)| Prediction::new(*s, *p)).collect())
    }

    fn nested(rows: &[&[(&str, f64)]]) -> MaskPredictions {
        MaskPredictions::Nested(
            rows.iter()
                .map(|row| row.iter().map(|(s, p)| Prediction::new(*s, *p)).collect())
                .collect(),
        )
    }

    #[test]
    fn flat_duplicates_collapse_to_first() {
        let picked = select_candidates(
            &flat(&[("foo", 0.9), ("bar", 0.5), ("foo", 0.3)]),
            &HashSet::new(),
            5,
        );
        assert_eq!(picked, vec!["foo", "bar"]);
    }

    #[test]
    fn flat_unsuitable_entries_do_not_use_a_place() {
        let existing: HashSet<String> = ["count".to_string()].into();
        let picked = select_candidates(
            &flat(&[(" count", 0.9), (" (", 0.5), (" int", 0.4), (" size", 0.3), (" n", 0.2)]),
            &existing,
            2,
        );
        assert_eq!(picked, vec!["size", "n"]);
    }

    #[test]
    fn nested_scores_sum_across_positions() {
        let predictions = nested(&[
            &[("a", 0.5), ("b", 0.4)],
            &[("b", 0.3), ("c", 0.6)],
        ]);
        // b = 0.7, c = 0.6, a = 0.5
        assert_eq!(select_candidates(&predictions, &HashSet::new(), 5), vec!["b", "c", "a"]);
        assert_eq!(select_candidates(&predictions, &HashSet::new(), 1), vec!["b"]);
    }

    #[test]
    fn nested_ties_keep_first_seen_order() {
        let predictions = nested(&[&[("x", 0.5)], &[("y", 0.5)]]);
        assert_eq!(select_candidates(&predictions, &HashSet::new(), 5), vec!["x", "y"]);
    }

    #[test]
    fn nested_merges_on_trimmed_surface() {
        let predictions = nested(&[&[(" idx", 0.2), ("i", 0.3)], &[("idx", 0.2)]]);
        assert_eq!(select_candidates(&predictions, &HashSet::new(), 5), vec!["idx", "i"]);
    }

    #[test]
    fn nested_nan_scores_rank_last() {
        let predictions = nested(&[
            &[("odd", f64::NAN), ("a", 0.2), ("b", 0.4)],
            &[("c", 0.3), ("odd", 0.9), ("d", f64::NAN)],
        ]);
        assert_eq!(
            select_candidates(&predictions, &HashSet::new(), 10),
            vec!["b", "c", "a", "odd", "d"]
        );
    }

    struct Fixed(MaskPredictions);

    impl MaskedLmOracle for Fixed {
        fn fill_mask(&self, _context: &str) -> Result<MaskPredictions> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl MaskedLmOracle for Broken {
        fn fill_mask(&self, _context: &str) -> Result<MaskPredictions> {
            Err(PipelineError::OracleShapeMismatch("scalar".into()))
        }
    }

    #[test]
    fn ranker_queries_the_oracle() {
        let ranker = CandidateRanker::new(Fixed(flat(&[("i", 0.9), ("j", 0.1)])), 5);
        assert_eq!(ranker.rank("<mask>++;", &HashSet::new()).unwrap(), vec!["i", "j"]);
    }

    #[test]
    fn ranker_propagates_oracle_errors() {
        let ranker = CandidateRanker::new(Broken, 5);
        assert!(matches!(
            ranker.rank("<mask>", &HashSet::new()),
            Err(PipelineError::OracleShapeMismatch(_))
        ));
    }
}

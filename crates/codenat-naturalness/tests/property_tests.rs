//! Property-based tests for the naturalness shift.
//!
//! Key invariants:
//! - A valid baseline always yields a finite score
//! - The score is positive exactly when the transformed entropy is higher
//! - Non-positive baselines are always rejected

use codenat_common::PipelineError;
use codenat_naturalness::{base_stem, relative_shift};
use proptest::prelude::*;

proptest! {
    #[test]
    fn valid_baselines_give_finite_scores(original in 1e-6f64..50.0, transformed in 0.0f64..50.0) {
        let shift = relative_shift(original, transformed).unwrap();
        prop_assert!(shift.is_finite());
        prop_assert_eq!(shift > 0.0, transformed > original);
        prop_assert!(shift >= -1.0);
    }

    #[test]
    fn non_positive_baselines_are_rejected(original in -50.0f64..=0.0, transformed in 0.0f64..50.0) {
        let is_invalid_baseline =
            matches!(relative_shift(original, transformed), Err(PipelineError::InvalidBaseline { .. }));
        prop_assert!(is_invalid_baseline);
    }

    #[test]
    fn infill_suffixes_resolve_to_the_original(stem in "[A-Z][A-Za-z0-9]{0,12}", rank in 0usize..100) {
        let random_name = format!("{stem}_random");
        let llm_name = format!("{stem}_llm_{rank}");
        prop_assert_eq!(base_stem(&random_name), stem.as_str());
        prop_assert_eq!(base_stem(&llm_name), stem.as_str());
        prop_assert_eq!(base_stem(&stem), stem.as_str());
    }
}

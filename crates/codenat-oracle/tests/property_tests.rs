//! Property-based tests for the logits adapters.
//!
//! Key invariants:
//! - Softmax output is a probability distribution
//! - `top_k_indices` is sorted descending and never longer than `k`
//! - Mean next-token loss is non-negative and bounded by the uniform case
//!   when the logits are uniform

use codenat_oracle::{mean_next_token_loss, softmax_in_place, top_k_indices};
use proptest::prelude::*;

proptest! {
    #[test]
    fn softmax_is_a_distribution(mut logits in prop::collection::vec(-20.0f32..20.0f32, 1..64)) {
        softmax_in_place(&mut logits);
        let sum: f32 = logits.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-4, "sum was {}", sum);
        prop_assert!(logits.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn top_k_is_sorted_and_bounded(
        values in prop::collection::vec(-5.0f32..5.0f32, 0..40),
        k in 0usize..50
    ) {
        let top = top_k_indices(&values, k);
        prop_assert_eq!(top.len(), k.min(values.len()));
        for pair in top.windows(2) {
            prop_assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn loss_is_non_negative(
        rows in prop::collection::vec(prop::collection::vec(-8.0f32..8.0f32, 6), 1..12),
        seed in any::<u32>()
    ) {
        let ids: Vec<u32> = (0..=rows.len() as u32).map(|i| (i.wrapping_mul(seed | 1)) % 6).collect();
        let loss = mean_next_token_loss(&rows, &ids).unwrap();
        prop_assert!(loss >= 0.0);
        prop_assert!(loss.is_finite());
    }

    #[test]
    fn uniform_logits_cost_log_vocab(len in 2usize..30, vocab in 2usize..50) {
        let rows = vec![vec![0.0f32; vocab]; len - 1];
        let ids: Vec<u32> = (0..len as u32).map(|i| i % vocab as u32).collect();
        let loss = mean_next_token_loss(&rows, &ids).unwrap();
        prop_assert!((loss - (vocab as f64).ln()).abs() < 1e-4);
    }
}

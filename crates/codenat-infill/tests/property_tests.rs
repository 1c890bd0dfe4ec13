//! Property-based tests for joint assignment, windowing and materialisation.
//!
//! Key invariants:
//! - At most `T^k` assignments, sorted by non-decreasing cost
//! - No assignment maps two slots to the same name
//! - Every cost equals the sum of its rank indices
//! - Windowing never drops the placeholder
//! - A fully materialised program contains no markers

use codenat_infill::{
    JointAssignment, MaskedSource, SlotCandidates, enumerate_assignments, truncate_at,
};
use codenat_lexer::{JavaLexer, SourceTokenizer};
use proptest::prelude::*;

/// `k` slots with `t` candidates each, drawn from a small pool so that
/// collisions are common.
fn candidate_table() -> impl Strategy<Value = Vec<SlotCandidates>> {
    (1usize..=4, 1usize..=4).prop_flat_map(|(k, t)| {
        prop::collection::vec(prop::collection::vec(0u8..6, t), k).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, row)| {
                    SlotCandidates::new(
                        format!("s{i}"),
                        row.into_iter().map(|c| format!("n{c}")).collect(),
                    )
                })
                .collect()
        })
    })
}

proptest! {
    #[test]
    fn assignments_are_bounded_and_sorted(table in candidate_table()) {
        let t = table[0].candidates.len();
        let ranked = enumerate_assignments(&table);
        prop_assert!(ranked.len() <= t.pow(table.len() as u32));
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].cost <= pair[1].cost);
        }
    }

    #[test]
    fn assignments_never_collide(table in candidate_table()) {
        for ranked in enumerate_assignments(&table) {
            prop_assert!(ranked.assignment.is_collision_free());
            prop_assert_eq!(ranked.assignment.len(), table.len());
            prop_assert_eq!(ranked.cost, ranked.ranks.iter().sum::<usize>());
            for (slot, rank) in table.iter().zip(&ranked.ranks) {
                prop_assert_eq!(
                    ranked.assignment.get(&slot.slot),
                    Some(slot.candidates[*rank].as_str())
                );
            }
        }
    }

    #[test]
    fn distinct_candidates_lose_nothing(k in 1usize..=3, t in 1usize..=4) {
        let table: Vec<SlotCandidates> = (0..k)
            .map(|i| SlotCandidates::new(format!("s{i}"), (0..t).map(|j| format!("v{i}_{j}")).collect()))
            .collect();
        prop_assert_eq!(enumerate_assignments(&table).len(), t.pow(k as u32));
    }

    #[test]
    fn windowing_keeps_the_placeholder(
        before in 0usize..1200,
        after in 0usize..1200,
        window in 1usize..700
    ) {
        let text = "a".repeat(before) + "<mask>" + &"b".repeat(after);
        let cut = truncate_at(&text, before, 6, window);
        prop_assert!(cut.contains("<mask>"));
        prop_assert!(cut.chars().count() <= window.max(6));
    }

    #[test]
    fn materialised_programs_have_no_markers(names in prop::collection::vec("[a-z]{1,6}", 1..5)) {
        let mut text = String::new();
        for (i, name) in names.iter().enumerate() {
            text.push_str(&format!("int ___MASKED_{name}___ = {i}; // ___MASKED_{name}___\n"));
        }
        let source = MaskedSource::parse(&text, &JavaLexer).unwrap();
        let assignment = JointAssignment::new(
            source.slots().iter().enumerate().map(|(i, s)| (s.clone(), format!("fresh{i}"))).collect(),
        );
        let filled = source.materialize(&assignment);
        prop_assert!(!filled.contains("___MASKED_"));
        let lexemes = JavaLexer.tokenize(&filled).unwrap();
        prop_assert!(lexemes.iter().all(|l| !l.contains("___MASKED_")));
    }
}

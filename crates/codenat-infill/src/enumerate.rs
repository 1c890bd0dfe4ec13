//! Collision-free joint assignments ranked by total rank.
//!
//! Given ranked candidates per slot, every rank-index tuple is visited in
//! lexicographic order (last slot varying fastest). A tuple is dropped as soon
//! as two slots resolve to the same string; survivors cost the sum of their
//! rank indices and are stably sorted by that cost, so equal-cost tuples keep
//! their enumeration order.
//!
//! The walk visits `len_1 * len_2 * ... * len_k` tuples, exponential in the
//! slot count `k`, and is not capped.

/// Ranked candidate names for one slot, best first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCandidates {
    pub slot: String,
    pub candidates: Vec<String>,
}

impl SlotCandidates {
    pub fn new(slot: impl Into<String>, candidates: Vec<String>) -> Self {
        Self { slot: slot.into(), candidates }
    }
}

/// Concrete names for every slot of one program variant, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JointAssignment {
    names: Vec<(String, String)>,
}

impl JointAssignment {
    pub fn new(names: Vec<(String, String)>) -> Self {
        Self { names }
    }

    /// Name assigned to `slot`.
    pub fn get(&self, slot: &str) -> Option<&str> {
        self.names.iter().find(|(s, _)| s == slot).map(|(_, name)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(s, n)| (s.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `true` if no two slots share a name.
    pub fn is_collision_free(&self) -> bool {
        self.names
            .iter()
            .enumerate()
            .all(|(i, (_, a))| self.names[i + 1..].iter().all(|(_, b)| a != b))
    }
}

/// One surviving rank tuple with the assignment it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedAssignment {
    pub assignment: JointAssignment,
    /// Chosen rank index per slot, in slot order.
    pub ranks: Vec<usize>,
    /// Sum of `ranks`; lower is more confident.
    pub cost: usize,
}

/// Every collision-free joint assignment, cheapest first.
///
/// Slots may have candidate lists of different lengths; each slot only
/// ranges over its own list. A slot with no candidates, or no slots at all,
/// yields no assignments.
pub fn enumerate_assignments(table: &[SlotCandidates]) -> Vec<RankedAssignment> {
    if table.is_empty() || table.iter().any(|s| s.candidates.is_empty()) {
        return Vec::new();
    }

    let radices: Vec<usize> = table.iter().map(|s| s.candidates.len()).collect();
    let mut ranks = vec![0usize; table.len()];
    let mut chosen: Vec<&str> = Vec::with_capacity(table.len());
    let mut survivors = Vec::new();

    loop {
        chosen.clear();
        let mut collides = false;
        for (slot, &rank) in table.iter().zip(&ranks) {
            let name = slot.candidates[rank].as_str();
            if chosen.contains(&name) {
                collides = true;
                break;
            }
            chosen.push(name);
        }

        if !collides {
            let names = table
                .iter()
                .zip(&chosen)
                .map(|(slot, name)| (slot.slot.clone(), (*name).to_string()))
                .collect();
            survivors.push(RankedAssignment {
                assignment: JointAssignment::new(names),
                ranks: ranks.clone(),
                cost: ranks.iter().sum(),
            });
        }

        if !advance(&mut ranks, &radices) {
            break;
        }
    }

    survivors.sort_by_key(|a| a.cost);
    survivors
}

/// Odometer step, last digit fastest. Returns `false` after the final tuple.
fn advance(ranks: &mut [usize], radices: &[usize]) -> bool {
    for (digit, &radix) in ranks.iter_mut().zip(radices).rev() {
        *digit += 1;
        if *digit < radix {
            return true;
        }
        *digit = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &[&str])]) -> Vec<SlotCandidates> {
        rows.iter()
            .map(|(slot, names)| {
                SlotCandidates::new(*slot, names.iter().map(|n| n.to_string()).collect())
            })
            .collect()
    }

    #[test]
    fn colliding_tuple_is_dropped() {
        let result = enumerate_assignments(&table(&[("x", &["a", "b"]), ("y", &["b", "c"])]));
        // (0,0)=a,b (0,1)=a,c (1,0)=b,b dropped (1,1)=b,c
        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|r| r.assignment.get("x") != r.assignment.get("y")));
        assert_eq!(result[0].cost, 0);
        assert_eq!(result[0].assignment.get("x"), Some("a"));
        assert_eq!(result[0].assignment.get("y"), Some("b"));
    }

    #[test]
    fn top_collision_falls_back_to_next_cheapest() {
        let result = enumerate_assignments(&table(&[("x", &["a", "b"]), ("y", &["a", "c"])]));
        assert_eq!(result[0].cost, 1);
        assert_eq!(result[0].ranks, vec![0, 1]);
        assert_eq!(result[0].assignment.get("y"), Some("c"));
    }

    #[test]
    fn equal_costs_keep_enumeration_order() {
        let result = enumerate_assignments(&table(&[("x", &["a", "b"]), ("y", &["c", "d"])]));
        let ranks: Vec<Vec<usize>> = result.iter().map(|r| r.ranks.clone()).collect();
        assert_eq!(ranks, vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn uneven_lists_range_over_their_own_length() {
        let result = enumerate_assignments(&table(&[("x", &["a"]), ("y", &["b", "c", "d"])]));
        assert_eq!(result.len(), 3);
        assert_eq!(result.last().unwrap().ranks, vec![0, 2]);
    }

    #[test]
    fn empty_inputs_yield_nothing() {
        assert!(enumerate_assignments(&[]).is_empty());
        assert!(enumerate_assignments(&table(&[("x", &["a"]), ("y", &[])])).is_empty());
    }

    #[test]
    fn single_slot_keeps_rank_order() {
        let result = enumerate_assignments(&table(&[("x", &["p", "q", "r"])]));
        let names: Vec<_> = result.iter().map(|r| r.assignment.get("x").unwrap()).collect();
        assert_eq!(names, vec!["p", "q", "r"]);
    }

    #[test]
    fn collision_free_check() {
        let ok = JointAssignment::new(vec![("x".into(), "a".into()), ("y".into(), "b".into())]);
        let bad = JointAssignment::new(vec![("x".into(), "a".into()), ("y".into(), "a".into())]);
        assert!(ok.is_collision_free());
        assert!(!bad.is_collision_free());
    }
}

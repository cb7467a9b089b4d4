use super::atoms::AtomSet;

/// Scores one candidate expression against a query.
///
/// `matched` is the set of query atoms the candidate contains. Higher scores rank first.
pub trait Ranker: Send + Sync {
    fn rank(&self, matched: &AtomSet, query_count: usize, candidate_count: usize) -> f64;
}

/// Harmonic mean of precision (`matched / candidate_count`) and recall
/// (`matched / query_count`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FMeasureRanker;

impl Ranker for FMeasureRanker {
    fn rank(&self, matched: &AtomSet, query_count: usize, candidate_count: usize) -> f64 {
        if matched.is_empty() || query_count == 0 || candidate_count == 0 {
            return 0.0;
        }
        let hits = matched.len() as f64;
        let precision = hits / candidate_count as f64;
        let recall = hits / query_count as f64;
        2.0 * precision * recall / (precision + recall)
    }
}

/// Number of shared atoms, ignoring both cardinalities.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchCountRanker;

impl Ranker for MatchCountRanker {
    fn rank(&self, matched: &AtomSet, _query_count: usize, _candidate_count: usize) -> f64 {
        matched.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::atoms::Atom;

    fn atoms(items: &[&str]) -> AtomSet {
        items.iter().map(|s| Atom::new(*s)).collect()
    }

    #[test]
    fn test_fmeasure_perfect_match_is_one() {
        let score = FMeasureRanker.rank(&atoms(&["a", "b"]), 2, 2);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fmeasure_prefers_tighter_candidate() {
        let matched = atoms(&["a", "b"]);
        let exact = FMeasureRanker.rank(&matched, 2, 2);
        let superset = FMeasureRanker.rank(&matched, 2, 3);
        assert!(exact > superset);
        // 2 * (2/3 * 1) / (2/3 + 1) = 0.8
        assert!((superset - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_fmeasure_degenerate_inputs_score_zero() {
        assert_eq!(FMeasureRanker.rank(&AtomSet::new(), 3, 3), 0.0);
        assert_eq!(FMeasureRanker.rank(&atoms(&["a"]), 0, 3), 0.0);
        assert_eq!(FMeasureRanker.rank(&atoms(&["a"]), 3, 0), 0.0);
    }

    #[test]
    fn test_match_count_ranker() {
        assert_eq!(MatchCountRanker.rank(&atoms(&["a", "b", "c"]), 10, 1), 3.0);
    }
}

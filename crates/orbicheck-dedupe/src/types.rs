//! Shared candidate/result shapes for both the customer and address dedupe
//! engines (§5).

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactEmail,
    ExactPhone,
    FuzzyName,
    ExactAddress,
    ExactPostal,
    FuzzyAddress,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Candidate {
    pub id: String,
    pub score: f64,
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    MergeWith,
    Review,
    CreateNew,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DedupeResult {
    pub candidates: Vec<Candidate>,
    pub suggested_action: SuggestedAction,
}

const FUZZY_THRESHOLD: f64 = 0.85;

/// Merge raw candidates by id, keeping the single highest-scoring match per
/// id, sort descending by score, then truncate to `limit`.
pub fn merge_and_truncate(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    let mut best: std::collections::HashMap<String, Candidate> = std::collections::HashMap::new();
    for c in candidates.drain(..) {
        best.entry(c.id.clone())
            .and_modify(|existing| {
                if c.score > existing.score {
                    *existing = c.clone();
                }
            })
            .or_insert(c);
    }
    let mut merged: Vec<Candidate> = best.into_values().collect();
    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(limit);
    merged
}

/// §4.6: `merge_with` if the top score is exact (1.0), `review` if it clears
/// the fuzzy threshold without being exact, `create_new` otherwise.
pub fn suggested_action(candidates: &[Candidate]) -> SuggestedAction {
    match candidates.first() {
        Some(top) if top.score >= 1.0 => SuggestedAction::MergeWith,
        Some(top) if top.score >= FUZZY_THRESHOLD => SuggestedAction::Review,
        _ => SuggestedAction::CreateNew,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, score: f64) -> Candidate {
        Candidate {
            id: id.to_string(),
            score,
            match_type: MatchType::FuzzyName,
        }
    }

    #[test]
    fn merge_keeps_highest_score_per_id() {
        let merged = merge_and_truncate(vec![candidate("a", 0.5), candidate("a", 0.9)], 5);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.9);
    }

    #[test]
    fn merge_sorts_descending_and_truncates() {
        let merged = merge_and_truncate(
            vec![candidate("a", 0.5), candidate("b", 0.95), candidate("c", 0.7)],
            2,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "b");
        assert_eq!(merged[1].id, "c");
    }

    #[test]
    fn suggested_action_exact_match_merges() {
        assert_eq!(suggested_action(&[candidate("a", 1.0)]), SuggestedAction::MergeWith);
    }

    #[test]
    fn suggested_action_fuzzy_match_reviews() {
        assert_eq!(suggested_action(&[candidate("a", 0.9)]), SuggestedAction::Review);
    }

    #[test]
    fn suggested_action_no_candidates_creates_new() {
        assert_eq!(suggested_action(&[]), SuggestedAction::CreateNew);
    }
}

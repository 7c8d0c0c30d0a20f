//! # Address Dedupe Engine (§4.6)

use crate::trigram;
use crate::types::{merge_and_truncate, suggested_action, Candidate, DedupeResult, MatchType};

const TOP_N: usize = 3;
const FUZZY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone)]
pub struct AddressRecord {
    pub id: String,
    pub address_hash: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub line1: String,
}

#[derive(Debug, Clone)]
pub struct AddressDedupeQuery {
    pub address_hash: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub line1: String,
}

/// Run exact-hash, exact-postal, and fuzzy matching against `existing`,
/// merge by id keeping the best score, and return the top 3.
pub fn find_candidates(query: &AddressDedupeQuery, existing: &[AddressRecord]) -> DedupeResult {
    let mut candidates = Vec::new();

    for record in existing {
        if record.address_hash == query.address_hash {
            candidates.push(Candidate {
                id: record.id.clone(),
                score: 1.0,
                match_type: MatchType::ExactAddress,
            });
            continue;
        }

        if record.postal_code == query.postal_code
            && record.city.to_lowercase() == query.city.to_lowercase()
            && record.country == query.country
        {
            candidates.push(Candidate {
                id: record.id.clone(),
                score: 1.0,
                match_type: MatchType::ExactPostal,
            });
            continue;
        }

        let score = trigram::similarity(&query.line1, &record.line1).max(trigram::similarity(&query.city, &record.city));
        if score > FUZZY_THRESHOLD {
            candidates.push(Candidate {
                id: record.id.clone(),
                score,
                match_type: MatchType::FuzzyAddress,
            });
        }
    }

    let candidates = merge_and_truncate(candidates, TOP_N);
    let action = suggested_action(&candidates);
    DedupeResult {
        candidates,
        suggested_action: action,
    }
}

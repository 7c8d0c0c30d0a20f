//! # Customer Dedupe Engine (§4.6)

use crate::trigram;
use crate::types::{merge_and_truncate, suggested_action, Candidate, DedupeResult, MatchType};

const TOP_N: usize = 5;
const FUZZY_NAME_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone)]
pub struct CustomerRecord {
    pub id: String,
    pub normalized_email: Option<String>,
    pub normalized_phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct CustomerDedupeQuery {
    pub normalized_email: Option<String>,
    pub normalized_phone: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Run exact-email, exact-phone, and fuzzy-name matching against `existing`,
/// merge by id keeping the best score, and return the top 5.
pub fn find_candidates(query: &CustomerDedupeQuery, existing: &[CustomerRecord]) -> DedupeResult {
    let query_name = format!("{} {}", query.first_name, query.last_name);
    let mut candidates = Vec::new();

    for record in existing {
        if let (Some(q), Some(r)) = (&query.normalized_email, &record.normalized_email) {
            if q == r {
                candidates.push(Candidate {
                    id: record.id.clone(),
                    score: 1.0,
                    match_type: MatchType::ExactEmail,
                });
                continue;
            }
        }

        if let (Some(q), Some(r)) = (&query.normalized_phone, &record.normalized_phone) {
            if q == r {
                candidates.push(Candidate {
                    id: record.id.clone(),
                    score: 1.0,
                    match_type: MatchType::ExactPhone,
                });
                continue;
            }
        }

        let record_name = format!("{} {}", record.first_name, record.last_name);
        let score = trigram::similarity(&query_name, &record_name);
        if score > FUZZY_NAME_THRESHOLD {
            candidates.push(Candidate {
                id: record.id.clone(),
                score,
                match_type: MatchType::FuzzyName,
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

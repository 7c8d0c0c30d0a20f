//! # Address Validator (§4.4)

use std::sync::Arc;

use orbicheck_cache::Cache;
use orbicheck_core::{digest::canonical_json, ReasonCode};

use crate::collaborators::{GeoPoint, Geocoder, PostalReferenceTable};

const FULL_RESULT_TTL_DAYS: i64 = 7;

/// PO-box patterns localized across a handful of markets. Case-insensitive
/// substring match against `line1`/`line2`, per spec.
const PO_BOX_PATTERNS: &[&str] = &[
    "po box", "p.o. box", "p.o box", "post office box", "apartado", "casilla", "caixa postal",
];

/// Rough bounding box per ISO country code, used for the
/// `address.geo_out_of_bounds` check. Not exhaustive — countries absent
/// from this table are treated as unbounded (no geo check applied).
const COUNTRY_BOUNDS: &[(&str, f64, f64, f64, f64)] = &[
    // country, min_lat, max_lat, min_lng, max_lng
    ("US", 18.0, 72.0, -180.0, -65.0),
    ("BR", -34.0, 6.0, -74.0, -32.0),
    ("MX", 14.0, 33.0, -118.0, -86.0),
    ("GB", 49.0, 61.0, -8.0, 2.0),
    ("DE", 47.0, 55.0, 5.0, 15.5),
];

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AddressInput {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub state: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NormalizedAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub state: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AddressValidationResult {
    pub valid: bool,
    pub normalized: NormalizedAddress,
    pub geo: Option<GeoPoint>,
    pub po_box: bool,
    pub postal_city_match: bool,
    pub in_bounds: Option<bool>,
    pub reason_codes: Vec<ReasonCode>,
    pub ttl_seconds: i64,
    #[serde(default)]
    pub request_id: String,
}

pub struct AddressValidator {
    cache: Arc<dyn Cache>,
    geocoder: Arc<dyn Geocoder>,
    postal_reference: Arc<dyn PostalReferenceTable>,
}

impl AddressValidator {
    pub fn new(
        cache: Arc<dyn Cache>,
        geocoder: Arc<dyn Geocoder>,
        postal_reference: Arc<dyn PostalReferenceTable>,
    ) -> Self {
        Self {
            cache,
            geocoder,
            postal_reference,
        }
    }

    pub async fn validate(&self, input: &AddressInput) -> AddressValidationResult {
        let normalized = normalize(input);
        let normalized_json = serde_json::to_value(&normalized).unwrap_or(serde_json::Value::Null);
        let cache_key = format!("validator:address:{}", canonical_json(&normalized_json));

        if let Some(cached) = self.cache.get(&cache_key) {
            if let Ok(result) = serde_json::from_str::<AddressValidationResult>(&cached) {
                return result;
            }
        }

        let mut reason_codes = Vec::new();

        let po_box = is_po_box(&normalized.line1) || normalized.line2.as_deref().map(is_po_box).unwrap_or(false);
        if po_box {
            reason_codes.push(ReasonCode::AddressPoBox);
        }

        let postal_city_match = match self
            .postal_reference
            .expected_city(&normalized.country, &normalized.postal_code)
            .await
        {
            None => {
                reason_codes.push(ReasonCode::AddressPostalReferenceUnknown);
                true
            }
            Some(expected_city) => {
                let matches = expected_city.eq_ignore_ascii_case(&normalized.city);
                if !matches {
                    reason_codes.push(ReasonCode::AddressPostalCityMismatch);
                }
                matches
            }
        };

        let geo = self.geocoder.geocode(&normalized_json).await;
        let in_bounds = match geo {
            Some(point) => {
                let bounds_ok = check_bounds(&normalized.country, point);
                if !bounds_ok {
                    reason_codes.push(ReasonCode::AddressGeoOutOfBounds);
                }
                Some(bounds_ok)
            }
            None => {
                reason_codes.push(ReasonCode::AddressGeocodeFailed);
                None
            }
        };

        let valid = !po_box && postal_city_match && in_bounds.unwrap_or(true);

        let result = AddressValidationResult {
            valid,
            normalized,
            geo,
            po_box,
            postal_city_match,
            in_bounds,
            reason_codes: orbicheck_core::dedup_preserve_order(reason_codes),
            ttl_seconds: FULL_RESULT_TTL_DAYS * 86_400,
            request_id: String::new(),
        };

        if let Ok(json) = serde_json::to_string(&result) {
            self.cache
                .set(&cache_key, json, chrono::Duration::days(FULL_RESULT_TTL_DAYS));
        }

        result
    }
}

/// Format-only normalization (§4.6): trim/case fold each field, uppercase
/// the country code. No geocoding, no cache, no reason codes — shared by
/// both the full validator and the cheap `/v1/normalize/address` endpoint.
pub fn normalize(input: &AddressInput) -> NormalizedAddress {
    NormalizedAddress {
        line1: input.line1.trim().to_string(),
        line2: input.line2.as_deref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        city: input.city.trim().to_string(),
        postal_code: input.postal_code.trim().to_string(),
        state: input.state.as_deref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        country: input.country.trim().to_uppercase(),
    }
}

fn is_po_box(line: &str) -> bool {
    let lower = line.to_lowercase();
    PO_BOX_PATTERNS.iter().any(|pattern| lower.contains(pattern))
}

fn check_bounds(country: &str, point: GeoPoint) -> bool {
    COUNTRY_BOUNDS
        .iter()
        .find(|(code, ..)| *code == country)
        .map(|(_, min_lat, max_lat, min_lng, max_lng)| {
            point.lat >= *min_lat && point.lat <= *max_lat && point.lng >= *min_lng && point.lng <= *max_lng
        })
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbicheck_cache::InMemoryCache;
    use crate::collaborators::{EmptyPostalReferenceTable, NullGeocoder};

    fn sample() -> AddressInput {
        AddressInput {
            line1: "123 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            postal_code: "62704".to_string(),
            state: Some("IL".to_string()),
            country: "us".to_string(),
        }
    }

    fn validator() -> AddressValidator {
        AddressValidator::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(NullGeocoder),
            Arc::new(EmptyPostalReferenceTable),
        )
    }

    #[test]
    fn normalize_trims_and_uppercases_country() {
        let normalized = normalize(&sample());
        assert_eq!(normalized.country, "US");
        assert_eq!(normalized.line1, "123 Main St");
    }

    #[test]
    fn po_box_patterns_detected_case_insensitively() {
        assert!(is_po_box("PO Box 123"));
        assert!(is_po_box("p.o. box 44"));
        assert!(is_po_box("Apartado 99"));
        assert!(!is_po_box("123 Main St"));
    }

    #[tokio::test]
    async fn missing_geocoder_yields_geocode_failed() {
        let result = validator().validate(&sample()).await;
        assert!(result.valid);
        assert_eq!(result.in_bounds, None);
        assert!(result.reason_codes.contains(&ReasonCode::AddressGeocodeFailed));
    }

    #[tokio::test]
    async fn missing_postal_reference_does_not_flag_invalid() {
        let result = validator().validate(&sample()).await;
        assert!(result.postal_city_match);
        assert!(result
            .reason_codes
            .contains(&ReasonCode::AddressPostalReferenceUnknown));
    }

    #[tokio::test]
    async fn po_box_line1_marks_invalid() {
        let mut input = sample();
        input.line1 = "PO Box 55".to_string();
        let result = validator().validate(&input).await;
        assert!(!result.valid);
        assert!(result.po_box);
        assert!(result.reason_codes.contains(&ReasonCode::AddressPoBox));
    }
}

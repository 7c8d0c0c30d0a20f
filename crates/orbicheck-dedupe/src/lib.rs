//! Customer and address dedupe engines: exact-match rules plus trigram-fuzzy
//! matching, merged by id and truncated per §4.6.

pub mod address;
pub mod customer;
pub mod trigram;
pub mod types;

pub use address::{AddressDedupeQuery, AddressRecord};
pub use customer::{CustomerDedupeQuery, CustomerRecord};
pub use types::{Candidate, DedupeResult, MatchType, SuggestedAction};

//! # Disposable-Domain Set
//!
//! §4.2: the email validator consults a refreshable set of known disposable
//! domains. The refresher builds the next generation off to the side and
//! swaps it in atomically — readers never see a partially populated set.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

/// Holds the currently active disposable-domain set behind an `Arc` so a
/// refresh can publish a whole new generation with a single pointer swap,
/// never mutating the set readers are using.
#[derive(Default)]
pub struct DisposableDomainSet {
    active: RwLock<Arc<HashSet<String>>>,
}

impl DisposableDomainSet {
    pub fn new(initial: HashSet<String>) -> Self {
        Self {
            active: RwLock::new(Arc::new(initial)),
        }
    }

    /// Domain is expected lowercase; callers normalize before calling.
    pub fn contains(&self, domain: &str) -> bool {
        self.active.read().contains(domain)
    }

    /// Build the replacement set and publish it as the new active generation.
    /// The old generation stays alive for any reader holding a clone of the
    /// `Arc` until they drop it.
    pub fn refresh(&self, next: HashSet<String>) {
        *self.active.write() = Arc::new(next);
    }

    pub fn len(&self) -> usize {
        self.active.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_checks_active_generation() {
        let set = DisposableDomainSet::new(["mailinator.com".to_string()].into());
        assert!(set.contains("mailinator.com"));
        assert!(!set.contains("gmail.com"));
    }

    #[test]
    fn refresh_replaces_the_whole_set() {
        let set = DisposableDomainSet::new(["old-domain.com".to_string()].into());
        set.refresh(["new-domain.com".to_string()].into());
        assert!(!set.contains("old-domain.com"));
        assert!(set.contains("new-domain.com"));
    }

    #[test]
    fn empty_set_contains_nothing() {
        let set = DisposableDomainSet::default();
        assert!(!set.contains("anything.com"));
        assert_eq!(set.len(), 0);
    }
}

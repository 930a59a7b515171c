//! Display-name registry with per-creator ordinal pools.
//!
//! Generated names look like `<template>_<ordinal>` where the ordinal is
//! the lowest number the creator is not already using. Custom names share
//! one namespace with generated ones: at any instant a live name belongs to
//! at most one session, regardless of who created it.
//!
//! All operations take one internal lock, so a reservation observed by any
//! caller is already globally visible.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use parking_lot::Mutex;

use specter_core::actor::Creator;
use specter_core::text::{char_len, truncate_chars};

use crate::errors::InvalidNameError;

/// A reserved display name.
///
/// Holds enough context to return the reservation on removal: the owning
/// creator and, for generated names, the ordinal to free back into the
/// creator's pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceName {
    /// The reserved display name.
    pub name: String,
    /// Name of the creator holding the reservation.
    pub creator: String,
    /// Position in the creator's pool; `None` for custom names.
    pub ordinal: Option<u32>,
}

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Default)]
struct Inner {
    live: HashSet<String>,
    ordinals: HashMap<String, BTreeSet<u32>>,
}

/// Registry of every display name a live session holds.
pub struct NameRegistry {
    template: String,
    max_length: usize,
    inner: Mutex<Inner>,
}

impl NameRegistry {
    /// A registry generating names from `template`, capped at `max_length`
    /// characters. An empty template falls back to the creator's own name.
    #[must_use]
    pub fn new(template: impl Into<String>, max_length: usize) -> Self {
        Self {
            template: template.into(),
            max_length,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Reserve the next free generated name for this creator.
    ///
    /// Ordinals start at 1 and fill the lowest gap. An ordinal whose
    /// generated name collides with any live name is skipped and stays
    /// free for later.
    pub fn register(&self, creator: &Creator) -> SequenceName {
        let base = if self.template.is_empty() {
            creator.name.as_str()
        } else {
            self.template.as_str()
        };

        let mut inner = self.inner.lock();
        let Inner { live, ordinals } = &mut *inner;
        let pool = ordinals.entry(creator.name.clone()).or_default();

        let mut ordinal = 1u32;
        loop {
            if pool.contains(&ordinal) {
                ordinal += 1;
                continue;
            }
            let candidate = sequence_name(base, ordinal, self.max_length);
            if live.contains(&candidate) {
                ordinal += 1;
                continue;
            }
            let _ = pool.insert(ordinal);
            let _ = live.insert(candidate.clone());
            return SequenceName {
                name: candidate,
                creator: creator.name.clone(),
                ordinal: Some(ordinal),
            };
        }
    }

    /// Reserve an explicit display name for this creator.
    pub fn custom(&self, creator: &Creator, name: &str) -> Result<SequenceName, InvalidNameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InvalidNameError::Blank);
        }
        if char_len(name) > self.max_length {
            return Err(InvalidNameError::TooLong {
                limit: self.max_length,
            });
        }

        let mut inner = self.inner.lock();
        if !inner.live.insert(name.to_owned()) {
            return Err(InvalidNameError::Taken {
                name: name.to_owned(),
            });
        }
        Ok(SequenceName {
            name: name.to_owned(),
            creator: creator.name.clone(),
            ordinal: None,
        })
    }

    /// Return a reservation. Idempotent; the name is immediately reusable.
    pub fn unregister(&self, name: &SequenceName) {
        let mut inner = self.inner.lock();
        let _ = inner.live.remove(&name.name);
        if let Some(ordinal) = name.ordinal {
            let emptied = match inner.ordinals.get_mut(&name.creator) {
                Some(pool) => {
                    let _ = pool.remove(&ordinal);
                    pool.is_empty()
                }
                None => false,
            };
            if emptied {
                let _ = inner.ordinals.remove(&name.creator);
            }
        }
    }

    /// Number of live reservations.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }
}

/// Generated name for one ordinal, truncating the stem so the whole name
/// fits the cap. The stem keeps at least one character even when the
/// suffix alone exceeds the cap.
fn sequence_name(base: &str, ordinal: u32, max_length: usize) -> String {
    let suffix = format!("_{ordinal}");
    let budget = max_length.saturating_sub(char_len(&suffix)).max(1);
    format!("{}{}", truncate_chars(base, budget), suffix)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use uuid::Uuid;

    fn creator(name: &str) -> Creator {
        Creator::player(name, Uuid::new_v4(), IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    #[test]
    fn first_registration_takes_ordinal_one() {
        let registry = NameRegistry::new("ghost", 16);
        let name = registry.register(&creator("alice"));
        assert_eq!(name.name, "ghost_1");
        assert_eq!(name.ordinal, Some(1));
    }

    #[test]
    fn ordinals_fill_the_lowest_gap() {
        let registry = NameRegistry::new("ghost", 16);
        let alice = creator("alice");
        let first = registry.register(&alice);
        let second = registry.register(&alice);
        let third = registry.register(&alice);
        assert_eq!(
            [&first.name, &second.name, &third.name],
            [&"ghost_1".to_owned(), &"ghost_2".to_owned(), &"ghost_3".to_owned()]
        );

        registry.unregister(&second);
        let reused = registry.register(&alice);
        assert_eq!(reused.name, "ghost_2");
    }

    #[test]
    fn empty_template_uses_creator_name() {
        let registry = NameRegistry::new("", 16);
        let name = registry.register(&creator("alice"));
        assert_eq!(name.name, "alice_1");
    }

    #[test]
    fn colliding_ordinal_is_skipped_not_consumed() {
        let registry = NameRegistry::new("ghost", 16);
        let alice = creator("alice");
        let bob = creator("bob");

        let alices = registry.register(&alice);
        assert_eq!(alices.name, "ghost_1");

        // bob's ordinal 1 collides with alice's live name, so bob lands on 2.
        let bobs = registry.register(&bob);
        assert_eq!(bobs.name, "ghost_2");
        assert_eq!(bobs.ordinal, Some(2));

        // Once alice's name frees up, bob's ordinal 1 is usable again.
        registry.unregister(&alices);
        let bobs_next = registry.register(&bob);
        assert_eq!(bobs_next.name, "ghost_1");
        assert_eq!(bobs_next.ordinal, Some(1));
    }

    #[test]
    fn long_template_is_truncated_to_fit() {
        let registry = NameRegistry::new("abcdefghijklmnopqrst", 16);
        let name = registry.register(&creator("alice"));
        assert_eq!(char_len(&name.name), 16);
        assert!(name.name.ends_with("_1"));
        assert!(name.name.starts_with("abcdefghijklmn"));
    }

    #[test]
    fn custom_rejects_blank() {
        let registry = NameRegistry::new("ghost", 16);
        assert_eq!(
            registry.custom(&creator("alice"), "   "),
            Err(InvalidNameError::Blank)
        );
    }

    #[test]
    fn custom_rejects_over_limit() {
        let registry = NameRegistry::new("ghost", 16);
        assert_eq!(
            registry.custom(&creator("alice"), "abcdefghijklmnopq"),
            Err(InvalidNameError::TooLong { limit: 16 })
        );
    }

    #[test]
    fn custom_rejects_live_name_across_creators() {
        let registry = NameRegistry::new("ghost", 16);
        let steve = registry.custom(&creator("alice"), "Steve").expect("free");
        assert_eq!(steve.ordinal, None);

        assert_eq!(
            registry.custom(&creator("bob"), "Steve"),
            Err(InvalidNameError::Taken {
                name: "Steve".into()
            })
        );
    }

    #[test]
    fn custom_name_is_reusable_after_unregister() {
        let registry = NameRegistry::new("ghost", 16);
        let steve = registry.custom(&creator("alice"), "Steve").expect("free");
        registry.unregister(&steve);
        assert!(registry.custom(&creator("bob"), "Steve").is_ok());
    }

    #[test]
    fn generated_and_custom_share_one_namespace() {
        let registry = NameRegistry::new("ghost", 16);
        let taken = registry.custom(&creator("alice"), "ghost_1").expect("free");
        let generated = registry.register(&creator("alice"));
        assert_eq!(generated.name, "ghost_2");

        registry.unregister(&taken);
        registry.unregister(&generated);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn unregister_is_idempotent() {
        let registry = NameRegistry::new("ghost", 16);
        let name = registry.register(&creator("alice"));
        registry.unregister(&name);
        registry.unregister(&name);
        assert_eq!(registry.live_count(), 0);
    }
}

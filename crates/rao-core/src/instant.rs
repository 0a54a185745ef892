//! Points of the operational timeline.
//!
//! An [`Instant`] is identified by its id and placed on the timeline by its
//! `order`. A CRAC always holds exactly one [`InstantKind::Preventive`] and
//! one [`InstantKind::Outage`] instant, followed by any number of automatic
//! and curative instants:
//!
//! ```text
//! preventive (0) < outage (1) < auto (2..) < curative 1 < curative 2 < ...
//! ```
//!
//! Instants compare by `order` only; the CRAC guarantees orders are unique.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Kind of an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstantKind {
    /// Before any contingency
    Preventive,
    /// Right after a contingency, before any automatic or curative response
    Outage,
    /// Automatic post-contingency response
    Auto,
    /// Operator-driven post-contingency response
    Curative,
}

impl std::fmt::Display for InstantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InstantKind::Preventive => "PREVENTIVE",
            InstantKind::Outage => "OUTAGE",
            InstantKind::Auto => "AUTO",
            InstantKind::Curative => "CURATIVE",
        };
        f.write_str(name)
    }
}

/// An ordered point of the operational timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instant {
    id: String,
    order: u32,
    kind: InstantKind,
}

impl Instant {
    pub fn new(id: impl Into<String>, order: u32, kind: InstantKind) -> Self {
        Self {
            id: id.into(),
            order,
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn kind(&self) -> InstantKind {
        self.kind
    }

    pub fn is_preventive(&self) -> bool {
        self.kind == InstantKind::Preventive
    }

    pub fn is_outage(&self) -> bool {
        self.kind == InstantKind::Outage
    }

    pub fn is_auto(&self) -> bool {
        self.kind == InstantKind::Auto
    }

    pub fn is_curative(&self) -> bool {
        self.kind == InstantKind::Curative
    }

    /// `true` iff this instant is strictly earlier on the timeline.
    pub fn comes_before(&self, other: &Instant) -> bool {
        self.order < other.order
    }

    /// `true` iff this instant is strictly later on the timeline.
    pub fn comes_after(&self, other: &Instant) -> bool {
        self.order > other.order
    }
}

impl PartialEq for Instant {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.id == other.id && self.kind == other.kind
    }
}

impl Eq for Instant {}

impl std::hash::Hash for Instant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.order.hash(state);
    }
}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instant {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ids only break ties between instants of different catalogs.
        self.order
            .cmp(&other.order)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

impl std::fmt::Display for Instant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> Vec<Instant> {
        vec![
            Instant::new("preventive", 0, InstantKind::Preventive),
            Instant::new("outage", 1, InstantKind::Outage),
            Instant::new("auto", 2, InstantKind::Auto),
            Instant::new("curative-1", 3, InstantKind::Curative),
            Instant::new("curative-2", 4, InstantKind::Curative),
        ]
    }

    #[test]
    fn test_comes_before_matches_order() {
        let instants = timeline();
        for a in &instants {
            for b in &instants {
                assert_eq!(a.comes_before(b), a.order() < b.order());
                assert_eq!(a.comes_before(b), a.cmp(b) == Ordering::Less);
                assert_eq!(a.comes_after(b), a.cmp(b) == Ordering::Greater);
            }
        }
    }

    #[test]
    fn test_kind_predicates() {
        let instants = timeline();
        assert!(instants[0].is_preventive());
        assert!(instants[1].is_outage());
        assert!(instants[2].is_auto());
        assert!(instants[3].is_curative());
        assert!(!instants[4].is_preventive());
    }

    #[test]
    fn test_sorting_follows_order() {
        let mut instants = timeline();
        instants.reverse();
        instants.sort();
        let ids: Vec<&str> = instants.iter().map(|i| i.id()).collect();
        assert_eq!(
            ids,
            vec!["preventive", "outage", "auto", "curative-1", "curative-2"]
        );
    }

    #[test]
    fn test_equality_requires_same_order() {
        let a = Instant::new("curative", 3, InstantKind::Curative);
        let b = Instant::new("curative", 4, InstantKind::Curative);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}

//! States: an instant, optionally following a contingency.
//!
//! The preventive state is the only state without a contingency. Every
//! post-contingency state pairs one contingency with one non-preventive
//! instant; the [`Crac`](crate::Crac) guarantees at most one state per pair.
//!
//! States are ordered by timestamp first, then by instant order. Two states
//! where exactly one carries a timestamp have no defined order, so
//! comparison goes through the fallible [`State::try_cmp`].

use crate::contingency::Contingency;
use crate::error::{CoreResult, RaoError};
use crate::instant::Instant;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct State {
    id: String,
    instant: Instant,
    contingency: Option<Arc<Contingency>>,
    timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// The state before any contingency. `instant` must be preventive.
    pub fn preventive(instant: Instant) -> Self {
        Self {
            id: instant.id().to_string(),
            instant,
            contingency: None,
            timestamp: None,
        }
    }

    /// A state following `contingency` at `instant`.
    pub fn post_contingency(instant: Instant, contingency: Arc<Contingency>) -> Self {
        Self {
            id: format!("{} - {}", contingency.id(), instant.id()),
            instant,
            contingency: Some(contingency),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instant(&self) -> &Instant {
        &self.instant
    }

    pub fn contingency(&self) -> Option<&Contingency> {
        self.contingency.as_deref()
    }

    pub fn contingency_id(&self) -> Option<&str> {
        self.contingency.as_deref().map(Contingency::id)
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// A state is preventive iff it has no contingency.
    pub fn is_preventive(&self) -> bool {
        self.contingency.is_none()
    }

    /// Timeline comparison.
    ///
    /// Equal timestamps (including both absent) compare by instant order;
    /// different timestamps compare chronologically; a timestamped state
    /// and a non-timestamped one cannot be compared.
    pub fn try_cmp(&self, other: &State) -> CoreResult<Ordering> {
        match (self.timestamp, other.timestamp) {
            (a, b) if a == b => Ok(self.instant.order().cmp(&other.instant.order())),
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            _ => Err(RaoError::Comparison(format!(
                "'{}' and '{}' do not both carry a timestamp",
                self.id, other.id
            ))),
        }
    }

    /// `true` iff this state is strictly earlier than `other`.
    pub fn comes_before(&self, other: &State) -> CoreResult<bool> {
        Ok(self.try_cmp(other)? == Ordering::Less)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.timestamp == other.timestamp
    }
}

impl Eq for State {}

impl std::hash::Hash for State {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.timestamp.hash(state);
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id)
    }
}

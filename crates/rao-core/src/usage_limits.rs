//! Per-instant caps on the number of remedial actions.
//!
//! [`RaUsageLimits`] caps, for one instant:
//!
//! - the total number of activated remedial actions,
//! - the number of distinct operators (TSOs) activating actions, except
//!   those listed in the exclusion set,
//! - per operator: remedial actions, topological actions, PSTs and
//!   elementary actions.
//!
//! Absent caps are [`Limit::Unbounded`]. Negative caps are clamped to zero
//! with a warning. Per-operator topological or PST caps above the same
//! operator's overall cap are rejected by the setter that introduces them,
//! leaving the limits unchanged.

use crate::error::{CoreResult, RaoError};
use crate::remedial_action::RemedialActionRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::warn;

/// A cap on a count. `AtMost(n) < Unbounded` for every `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    AtMost(u32),
    Unbounded,
}

impl Limit {
    /// Build a cap from a signed value, clamping negatives to zero. A value
    /// too large for any count is no cap at all.
    pub fn clamped(value: i64, field: &str) -> Limit {
        if value < 0 {
            warn!(field = field, value = value, "negative remedial action limit clamped to 0");
            return Limit::AtMost(0);
        }
        match u32::try_from(value) {
            Ok(max) => Limit::AtMost(max),
            Err(_) => Limit::Unbounded,
        }
    }

    pub fn allows(self, count: usize) -> bool {
        match self {
            Limit::Unbounded => true,
            Limit::AtMost(max) => count <= max as usize,
        }
    }

    pub fn value(self) -> Option<u32> {
        match self {
            Limit::Unbounded => None,
            Limit::AtMost(max) => Some(max),
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Limit::Unbounded => f.write_str("unbounded"),
            Limit::AtMost(max) => write!(f, "{max}"),
        }
    }
}

/// A cap exceeded by a combination of remedial actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitViolation {
    TooManyRemedialActions { count: usize, max: u32 },
    TooManyOperators { count: usize, max: u32 },
    TooManyTopologicalActions { count: usize, max: u32 },
    TooManyPsts { count: usize, max: u32 },
    TooManyRemedialActionsForOperator { operator: String, count: usize, max: u32 },
    TooManyTopologicalActionsForOperator { operator: String, count: usize, max: u32 },
    TooManyPstsForOperator { operator: String, count: usize, max: u32 },
    TooManyElementaryActionsForOperator { operator: String, count: usize, max: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaUsageLimits {
    max_ra: Limit,
    max_tso: Limit,
    max_topo: Limit,
    max_pst: Limit,
    max_topo_per_tso: BTreeMap<String, u32>,
    max_pst_per_tso: BTreeMap<String, u32>,
    max_ra_per_tso: BTreeMap<String, u32>,
    max_elementary_actions_per_tso: BTreeMap<String, u32>,
    max_tso_exclusion: BTreeSet<String>,
}

impl Default for RaUsageLimits {
    fn default() -> Self {
        Self {
            max_ra: Limit::Unbounded,
            max_tso: Limit::Unbounded,
            max_topo: Limit::Unbounded,
            max_pst: Limit::Unbounded,
            max_topo_per_tso: BTreeMap::new(),
            max_pst_per_tso: BTreeMap::new(),
            max_ra_per_tso: BTreeMap::new(),
            max_elementary_actions_per_tso: BTreeMap::new(),
            max_tso_exclusion: BTreeSet::new(),
        }
    }
}

fn clamp_map(map: HashMap<String, i64>, field: &str) -> BTreeMap<String, u32> {
    map.into_iter()
        .map(|(tso, value)| {
            let limit = Limit::clamped(value, field).value().unwrap_or(u32::MAX);
            (tso, limit)
        })
        .collect()
}

fn per_tso(map: &BTreeMap<String, u32>, tso: &str) -> Limit {
    map.get(tso).map_or(Limit::Unbounded, |max| Limit::AtMost(*max))
}

impl RaUsageLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_ra(&self) -> Limit {
        self.max_ra
    }

    pub fn max_tso(&self) -> Limit {
        self.max_tso
    }

    pub fn max_topo(&self) -> Limit {
        self.max_topo
    }

    pub fn max_pst(&self) -> Limit {
        self.max_pst
    }

    pub fn max_ra_per_tso(&self, tso: &str) -> Limit {
        per_tso(&self.max_ra_per_tso, tso)
    }

    pub fn max_topo_per_tso(&self, tso: &str) -> Limit {
        per_tso(&self.max_topo_per_tso, tso)
    }

    pub fn max_pst_per_tso(&self, tso: &str) -> Limit {
        per_tso(&self.max_pst_per_tso, tso)
    }

    pub fn max_elementary_actions_per_tso(&self, tso: &str) -> Limit {
        per_tso(&self.max_elementary_actions_per_tso, tso)
    }

    pub fn max_tso_exclusion(&self) -> &BTreeSet<String> {
        &self.max_tso_exclusion
    }

    pub fn set_max_ra(&mut self, value: i64) {
        self.max_ra = Limit::clamped(value, "max-ra");
    }

    pub fn set_max_tso(&mut self, value: i64) {
        self.max_tso = Limit::clamped(value, "max-tso");
    }

    pub fn set_max_topo(&mut self, value: i64) {
        self.max_topo = Limit::clamped(value, "max-topo");
    }

    pub fn set_max_pst(&mut self, value: i64) {
        self.max_pst = Limit::clamped(value, "max-pst");
    }

    pub fn set_max_tso_exclusion(&mut self, excluded: HashSet<String>) {
        self.max_tso_exclusion = excluded.into_iter().collect();
    }

    pub fn set_max_elementary_actions_per_tso(&mut self, map: HashMap<String, i64>) {
        self.max_elementary_actions_per_tso = clamp_map(map, "max-elementary-actions-per-tso");
    }

    pub fn set_max_topo_per_tso(&mut self, map: HashMap<String, i64>) -> CoreResult<()> {
        let topo = clamp_map(map, "max-topo-per-tso");
        Self::cross_check(&self.max_ra_per_tso, &topo, &self.max_pst_per_tso)?;
        self.max_topo_per_tso = topo;
        Ok(())
    }

    pub fn set_max_pst_per_tso(&mut self, map: HashMap<String, i64>) -> CoreResult<()> {
        let pst = clamp_map(map, "max-pst-per-tso");
        Self::cross_check(&self.max_ra_per_tso, &self.max_topo_per_tso, &pst)?;
        self.max_pst_per_tso = pst;
        Ok(())
    }

    pub fn set_max_ra_per_tso(&mut self, map: HashMap<String, i64>) -> CoreResult<()> {
        let ra = clamp_map(map, "max-ra-per-tso");
        Self::cross_check(&ra, &self.max_topo_per_tso, &self.max_pst_per_tso)?;
        self.max_ra_per_tso = ra;
        Ok(())
    }

    /// Every declared topological or PST cap must fit in the operator's
    /// overall cap (unbounded when the operator has none).
    fn cross_check(
        ra: &BTreeMap<String, u32>,
        topo: &BTreeMap<String, u32>,
        pst: &BTreeMap<String, u32>,
    ) -> CoreResult<()> {
        for (kind, map) in [("topological", topo), ("PST", pst)] {
            for (tso, max) in map {
                let ra_limit = per_tso(ra, tso);
                if Limit::AtMost(*max) > ra_limit {
                    return Err(RaoError::Config(format!(
                        "TSO {tso} has a maximum number of allowed RAs ({ra_limit}) smaller than \
                         its maximum number of allowed {kind} RAs ({max})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Caps exceeded by activating all of `actions` at this instant.
    pub fn check(&self, actions: &[RemedialActionRef<'_>]) -> Vec<LimitViolation> {
        let mut violations = Vec::new();

        let total = actions.len();
        if let Limit::AtMost(max) = self.max_ra {
            if total > max as usize {
                violations.push(LimitViolation::TooManyRemedialActions { count: total, max });
            }
        }

        let topo = actions.iter().filter(|a| a.is_topological()).count();
        if let Limit::AtMost(max) = self.max_topo {
            if topo > max as usize {
                violations.push(LimitViolation::TooManyTopologicalActions { count: topo, max });
            }
        }

        let psts = actions.iter().filter(|a| a.is_pst()).count();
        if let Limit::AtMost(max) = self.max_pst {
            if psts > max as usize {
                violations.push(LimitViolation::TooManyPsts { count: psts, max });
            }
        }

        let mut by_tso: BTreeMap<&str, Vec<&RemedialActionRef<'_>>> = BTreeMap::new();
        for action in actions {
            if let Some(tso) = action.operator() {
                by_tso.entry(tso).or_default().push(action);
            }
        }

        let counted_tsos = by_tso
            .keys()
            .filter(|tso| !self.max_tso_exclusion.contains(**tso))
            .count();
        if let Limit::AtMost(max) = self.max_tso {
            if counted_tsos > max as usize {
                violations.push(LimitViolation::TooManyOperators {
                    count: counted_tsos,
                    max,
                });
            }
        }

        for (tso, tso_actions) in &by_tso {
            let operator = tso.to_string();
            let count = tso_actions.len();
            if let Limit::AtMost(max) = self.max_ra_per_tso(tso) {
                if count > max as usize {
                    violations.push(LimitViolation::TooManyRemedialActionsForOperator {
                        operator: operator.clone(),
                        count,
                        max,
                    });
                }
            }
            let count = tso_actions.iter().filter(|a| a.is_topological()).count();
            if let Limit::AtMost(max) = self.max_topo_per_tso(tso) {
                if count > max as usize {
                    violations.push(LimitViolation::TooManyTopologicalActionsForOperator {
                        operator: operator.clone(),
                        count,
                        max,
                    });
                }
            }
            let count = tso_actions.iter().filter(|a| a.is_pst()).count();
            if let Limit::AtMost(max) = self.max_pst_per_tso(tso) {
                if count > max as usize {
                    violations.push(LimitViolation::TooManyPstsForOperator {
                        operator: operator.clone(),
                        count,
                        max,
                    });
                }
            }
            let count: usize = tso_actions.iter().map(|a| a.elementary_action_count()).sum();
            if let Limit::AtMost(max) = self.max_elementary_actions_per_tso(tso) {
                if count > max as usize {
                    violations.push(LimitViolation::TooManyElementaryActionsForOperator {
                        operator,
                        count,
                        max,
                    });
                }
            }
        }

        violations
    }
}

//! RAO parameters: what the objective function optimizes and how it prices
//! secondary concerns.
//!
//! Every section is optional in the file and falls back to its defaults, so
//! an empty document is a valid parameter set:
//!
//! ```yaml
//! objective_function:
//!   type: max_min_relative_margin
//!   unit: megawatt
//! mnec:
//!   acceptable_margin_decrease: 50.0
//!   violation_cost: 10.0
//! sensitivity:
//!   failure_overcost: 10000.0
//! ra_usage_limits_per_instant:
//!   curative:
//!     max_ra: 3
//!     max_topo_per_tso: { BE: 1 }
//! unoptimized_cnecs_in_series_with_psts:
//!   cnec-co1-curative: pst-1
//! ```

use anyhow::{Context, Result};
use rao_core::{CoreResult, Crac, RaUsageLimits, RaoError, Unit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveFunctionType {
    #[default]
    MaxMinMargin,
    MaxMinRelativeMargin,
}

/// Flow unit the margins are optimized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginUnit {
    #[default]
    Megawatt,
    Ampere,
}

impl From<MarginUnit> for Unit {
    fn from(unit: MarginUnit) -> Unit {
        match unit {
            MarginUnit::Megawatt => Unit::Megawatt,
            MarginUnit::Ampere => Unit::Ampere,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveFunctionParameters {
    #[serde(default, rename = "type")]
    pub kind: ObjectiveFunctionType,
    #[serde(default)]
    pub unit: MarginUnit,
    /// Keep optimizing curative states once the preventive perimeter is secure
    #[serde(default)]
    pub enforce_curative_security: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MnecParameters {
    /// MW of margin an MNEC may lose before being penalized
    #[serde(default = "default_acceptable_margin_decrease")]
    pub acceptable_margin_decrease: f64,
    #[serde(default = "default_mnec_violation_cost")]
    pub violation_cost: f64,
    #[serde(default)]
    pub constraint_adjustment_coefficient: f64,
}

fn default_acceptable_margin_decrease() -> f64 {
    50.0
}

fn default_mnec_violation_cost() -> f64 {
    10.0
}

impl Default for MnecParameters {
    fn default() -> Self {
        Self {
            acceptable_margin_decrease: default_acceptable_margin_decrease(),
            violation_cost: default_mnec_violation_cost(),
            constraint_adjustment_coefficient: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopFlowParameters {
    /// MW a loop flow may grow above its initial value
    #[serde(default)]
    pub acceptable_increase: f64,
    #[serde(default)]
    pub violation_cost: f64,
    #[serde(default)]
    pub constraint_adjustment_coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityParameters {
    #[serde(default = "default_failure_overcost")]
    pub failure_overcost: f64,
    #[serde(default)]
    pub fallback_overcost: f64,
}

fn default_failure_overcost() -> f64 {
    10_000.0
}

impl Default for SensitivityParameters {
    fn default() -> Self {
        Self {
            failure_overcost: default_failure_overcost(),
            fallback_overcost: 0.0,
        }
    }
}

/// Raw usage caps of one instant, as written in a parameter file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaUsageLimitsConfig {
    pub max_ra: Option<i64>,
    pub max_tso: Option<i64>,
    pub max_topo: Option<i64>,
    pub max_pst: Option<i64>,
    #[serde(default)]
    pub max_topo_per_tso: HashMap<String, i64>,
    #[serde(default)]
    pub max_pst_per_tso: HashMap<String, i64>,
    #[serde(default)]
    pub max_ra_per_tso: HashMap<String, i64>,
    #[serde(default)]
    pub max_elementary_actions_per_tso: HashMap<String, i64>,
    #[serde(default)]
    pub max_tso_exclusion: HashSet<String>,
}

impl RaUsageLimitsConfig {
    /// Validated limits; inconsistent per-operator caps are rejected.
    pub fn to_limits(&self) -> CoreResult<RaUsageLimits> {
        let mut limits = RaUsageLimits::new();
        if let Some(max) = self.max_ra {
            limits.set_max_ra(max);
        }
        if let Some(max) = self.max_tso {
            limits.set_max_tso(max);
        }
        if let Some(max) = self.max_topo {
            limits.set_max_topo(max);
        }
        if let Some(max) = self.max_pst {
            limits.set_max_pst(max);
        }
        limits.set_max_ra_per_tso(self.max_ra_per_tso.clone())?;
        limits.set_max_topo_per_tso(self.max_topo_per_tso.clone())?;
        limits.set_max_pst_per_tso(self.max_pst_per_tso.clone())?;
        limits.set_max_elementary_actions_per_tso(self.max_elementary_actions_per_tso.clone());
        limits.set_max_tso_exclusion(self.max_tso_exclusion.clone());
        Ok(limits)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaoParameters {
    #[serde(default)]
    pub objective_function: ObjectiveFunctionParameters,
    #[serde(default)]
    pub mnec: MnecParameters,
    #[serde(default)]
    pub loop_flow: LoopFlowParameters,
    #[serde(default)]
    pub sensitivity: SensitivityParameters,
    #[serde(default)]
    pub ra_usage_limits_per_instant: BTreeMap<String, RaUsageLimitsConfig>,
    /// CNEC id -> id of the PST in series that secures it
    #[serde(default)]
    pub unoptimized_cnecs_in_series_with_psts: BTreeMap<String, String>,
}

impl RaoParameters {
    pub fn from_json_str(data: &str) -> Result<Self> {
        serde_json::from_str(data).context("parsing RAO parameters json")
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        serde_yaml::from_str(data).context("parsing RAO parameters yaml")
    }

    /// Load parameters, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading RAO parameters '{}'", path.display()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::from_yaml_str(&data)
            }
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&data),
            _ => serde_yaml::from_str(&data)
                .or_else(|_| serde_json::from_str(&data))
                .with_context(|| format!("parsing RAO parameters '{}'", path.display())),
        }
    }

    /// Check every id the parameters refer to against `crac`.
    pub fn validate(&self, crac: &Crac) -> CoreResult<()> {
        for instant_id in self.ra_usage_limits_per_instant.keys() {
            crac.instant(instant_id)?;
        }
        for (cnec_id, pst_id) in &self.unoptimized_cnecs_in_series_with_psts {
            if crac.flow_cnec(cnec_id).is_none() {
                return Err(RaoError::Config(format!(
                    "CNEC '{cnec_id}' in series with PST '{pst_id}' is not in CRAC '{}'",
                    crac.id()
                )));
            }
            match crac.range_action(pst_id) {
                Some(ra) if ra.is_pst() => {}
                Some(_) => {
                    return Err(RaoError::Config(format!(
                        "range action '{pst_id}' in series with CNEC '{cnec_id}' is not a PST"
                    )))
                }
                None => {
                    return Err(RaoError::Config(format!(
                        "PST '{pst_id}' in series with CNEC '{cnec_id}' is not in CRAC '{}'",
                        crac.id()
                    )))
                }
            }
        }
        for (name, value) in [
            ("mnec.violation_cost", self.mnec.violation_cost),
            ("loop_flow.violation_cost", self.loop_flow.violation_cost),
            ("sensitivity.failure_overcost", self.sensitivity.failure_overcost),
            ("sensitivity.fallback_overcost", self.sensitivity.fallback_overcost),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(RaoError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Validated usage limits, keyed by instant id.
    pub fn ra_usage_limits(&self) -> CoreResult<BTreeMap<String, RaUsageLimits>> {
        self.ra_usage_limits_per_instant
            .iter()
            .map(|(instant_id, config)| {
                let limits = config.to_limits().map_err(|err| {
                    RaoError::Config(format!("usage limits of instant '{instant_id}': {err}"))
                })?;
                Ok((instant_id.clone(), limits))
            })
            .collect()
    }

    /// Install the configured usage limits on `crac`.
    pub fn apply_usage_limits(&self, crac: &mut Crac) -> CoreResult<()> {
        for (instant_id, limits) in self.ra_usage_limits()? {
            crac.set_ra_usage_limits(&instant_id, limits)?;
        }
        Ok(())
    }
}

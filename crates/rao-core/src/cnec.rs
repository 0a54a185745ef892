//! Flow CNECs: monitored branches in a given state, with their thresholds.
//!
//! A [`FlowCnec`] watches the flow on one network element in one
//! [`State`]. It is *optimized* when its margin drives the objective
//! function, *monitored* when it must merely not be degraded (an MNEC), or
//! both. A CNEC that is neither is rejected by [`FlowCnecBuilder::build`].
//!
//! ## Thresholds and units
//!
//! Thresholds are declared per side in MW, A or %Imax and converted on
//! demand to the flow unit requested by the caller:
//!
//! ```text
//! %Imax → A:   I = pct / 100 · Imax(side)
//! A → MW:      P = √3 · U(side) · I / 1000
//! ```
//!
//! The reliability margin (MW) is subtracted from every bound. A conversion
//! that lacks the nominal voltage or Imax of the side yields `NaN`.

use crate::error::{CoreResult, RaoError};
use crate::result::nan_aware_min;
use crate::state::State;
use crate::units::{Amperes, Kilovolts, Megawatts, Unit};
use serde::{Deserialize, Serialize};

/// Side of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }
}

/// Operational limit on one side of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchThreshold {
    pub side: Side,
    pub unit: Unit,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl BranchThreshold {
    /// Symmetric limit `[-limit, limit]`.
    pub fn symmetric(side: Side, unit: Unit, limit: f64) -> Self {
        Self {
            side,
            unit,
            min: Some(-limit),
            max: Some(limit),
        }
    }

    pub fn asymmetric(side: Side, unit: Unit, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            side,
            unit,
            min,
            max,
        }
    }
}

/// Maximum admissible loop-flow on a CNEC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopFlowThreshold {
    pub value: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone)]
pub struct FlowCnec {
    id: String,
    name: Option<String>,
    network_element_id: String,
    operator: Option<String>,
    state: State,
    optimized: bool,
    monitored: bool,
    /// Always in MW
    reliability_margin: f64,
    thresholds: Vec<BranchThreshold>,
    nominal_voltage: [Option<f64>; 2],
    i_max: [Option<f64>; 2],
    loop_flow_threshold: Option<LoopFlowThreshold>,
}

impl FlowCnec {
    pub fn builder(
        id: impl Into<String>,
        network_element_id: impl Into<String>,
        state: State,
    ) -> FlowCnecBuilder {
        FlowCnecBuilder {
            id: id.into(),
            name: None,
            network_element_id: network_element_id.into(),
            operator: None,
            state,
            optimized: true,
            monitored: false,
            reliability_margin: 0.0,
            thresholds: Vec::new(),
            nominal_voltage: [None; 2],
            i_max: [None; 2],
            loop_flow_threshold: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn network_element_id(&self) -> &str {
        &self.network_element_id
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_optimized(&self) -> bool {
        self.optimized
    }

    pub fn is_monitored(&self) -> bool {
        self.monitored
    }

    pub fn reliability_margin(&self) -> f64 {
        self.reliability_margin
    }

    pub fn thresholds(&self) -> &[BranchThreshold] {
        &self.thresholds
    }

    pub fn nominal_voltage(&self, side: Side) -> Option<f64> {
        self.nominal_voltage[side.index()]
    }

    pub fn i_max(&self, side: Side) -> Option<f64> {
        self.i_max[side.index()]
    }

    pub fn loop_flow_threshold(&self) -> Option<LoopFlowThreshold> {
        self.loop_flow_threshold
    }

    /// Sides carrying at least one threshold.
    pub fn monitored_sides(&self) -> Vec<Side> {
        Side::BOTH
            .into_iter()
            .filter(|side| self.thresholds.iter().any(|t| t.side == *side))
            .collect()
    }

    /// Convert a value between units on the given side.
    pub fn convert(&self, value: f64, from: Unit, to: Unit, side: Side) -> f64 {
        if from == to {
            return value;
        }
        let kv = self.nominal_voltage(side).map(Kilovolts);
        let amperes = match from {
            Unit::Ampere => Amperes(value),
            Unit::PercentImax => match self.i_max(side) {
                Some(i_max) => Amperes::from_percent_imax(value, Amperes(i_max)),
                None => return f64::NAN,
            },
            Unit::Megawatt => match (to, kv) {
                (Unit::Ampere, Some(kv)) => return Megawatts(value).to_amperes(kv).value(),
                _ => return f64::NAN,
            },
            _ => return f64::NAN,
        };
        match (to, kv) {
            (Unit::Ampere, _) => amperes.value(),
            (Unit::Megawatt, Some(kv)) => amperes.to_megawatts(kv).value(),
            _ => f64::NAN,
        }
    }

    fn reliability_margin_in(&self, side: Side, unit: Unit) -> f64 {
        if self.reliability_margin == 0.0 {
            0.0
        } else {
            self.convert(self.reliability_margin, Unit::Megawatt, unit, side)
        }
    }

    /// Most restrictive upper bound on `side`, reliability margin included.
    pub fn upper_bound(&self, side: Side, unit: Unit) -> Option<f64> {
        if !unit.is_flow_unit() {
            return None;
        }
        let bound = self
            .thresholds
            .iter()
            .filter(|t| t.side == side)
            .filter_map(|t| t.max.map(|max| self.convert(max, t.unit, unit, side)))
            .reduce(nan_aware_min)?;
        Some(bound - self.reliability_margin_in(side, unit))
    }

    /// Most restrictive lower bound on `side`, reliability margin included.
    pub fn lower_bound(&self, side: Side, unit: Unit) -> Option<f64> {
        if !unit.is_flow_unit() {
            return None;
        }
        let bound = self
            .thresholds
            .iter()
            .filter(|t| t.side == side)
            .filter_map(|t| t.min.map(|min| self.convert(min, t.unit, unit, side)))
            .reduce(|a, b| -nan_aware_min(-a, -b))?;
        Some(bound + self.reliability_margin_in(side, unit))
    }

    /// Distance from `flow` to the closest bound on `side`.
    ///
    /// Negative when the flow violates a bound, `+∞` when the side has no
    /// bound at all, `NaN` when the flow or a bound is undefined.
    pub fn compute_margin(&self, flow: f64, side: Side, unit: Unit) -> f64 {
        if flow.is_nan() || !unit.is_flow_unit() {
            return f64::NAN;
        }
        let above = self
            .upper_bound(side, unit)
            .map_or(f64::INFINITY, |upper| upper - flow);
        let below = self
            .lower_bound(side, unit)
            .map_or(f64::INFINITY, |lower| flow - lower);
        nan_aware_min(above, below)
    }

    /// Loop-flow threshold on `side`, converted to `unit`.
    pub fn loop_flow_threshold_in(&self, side: Side, unit: Unit) -> Option<f64> {
        self.loop_flow_threshold
            .map(|t| self.convert(t.value, t.unit, unit, side))
    }

    /// Largest absolute bound over monitored sides, `0` without bounds.
    pub fn largest_threshold(&self, unit: Unit) -> f64 {
        self.monitored_sides()
            .into_iter()
            .map(|side| {
                let upper = self.upper_bound(side, unit).unwrap_or(0.0).abs();
                let lower = self.lower_bound(side, unit).unwrap_or(0.0).abs();
                upper.max(lower)
            })
            .fold(0.0, f64::max)
    }
}

impl PartialEq for FlowCnec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FlowCnec {}

impl std::hash::Hash for FlowCnec {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Builder for [`FlowCnec`]; defaults to optimized and not monitored.
#[derive(Debug, Clone)]
pub struct FlowCnecBuilder {
    id: String,
    name: Option<String>,
    network_element_id: String,
    operator: Option<String>,
    state: State,
    optimized: bool,
    monitored: bool,
    reliability_margin: f64,
    thresholds: Vec<BranchThreshold>,
    nominal_voltage: [Option<f64>; 2],
    i_max: [Option<f64>; 2],
    loop_flow_threshold: Option<LoopFlowThreshold>,
}

impl FlowCnecBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn optimized(mut self, optimized: bool) -> Self {
        self.optimized = optimized;
        self
    }

    pub fn monitored(mut self, monitored: bool) -> Self {
        self.monitored = monitored;
        self
    }

    /// Reliability margin in MW.
    pub fn reliability_margin(mut self, margin: f64) -> Self {
        self.reliability_margin = margin;
        self
    }

    pub fn threshold(mut self, threshold: BranchThreshold) -> Self {
        self.thresholds.push(threshold);
        self
    }

    pub fn nominal_voltage(mut self, side: Side, kv: f64) -> Self {
        self.nominal_voltage[side.index()] = Some(kv);
        self
    }

    /// Same nominal voltage on both sides.
    pub fn nominal_voltages(self, kv: f64) -> Self {
        self.nominal_voltage(Side::One, kv)
            .nominal_voltage(Side::Two, kv)
    }

    pub fn i_max(mut self, side: Side, amperes: f64) -> Self {
        self.i_max[side.index()] = Some(amperes);
        self
    }

    pub fn loop_flow_threshold(mut self, value: f64, unit: Unit) -> Self {
        self.loop_flow_threshold = Some(LoopFlowThreshold { value, unit });
        self
    }

    pub fn build(self) -> CoreResult<FlowCnec> {
        if !self.optimized && !self.monitored {
            return Err(RaoError::Config(format!(
                "FlowCnec '{}' must be optimized, monitored or both",
                self.id
            )));
        }
        if self.thresholds.is_empty() {
            return Err(RaoError::Config(format!(
                "FlowCnec '{}' has no threshold",
                self.id
            )));
        }
        for threshold in &self.thresholds {
            self.check_threshold(threshold)?;
        }
        if let Some(lf) = self.loop_flow_threshold {
            if !matches!(lf.unit, Unit::Megawatt | Unit::PercentImax) {
                return Err(RaoError::Config(format!(
                    "FlowCnec '{}': loop-flow threshold must be in MW or %Imax, got {}",
                    self.id, lf.unit
                )));
            }
        }

        Ok(FlowCnec {
            id: self.id,
            name: self.name,
            network_element_id: self.network_element_id,
            operator: self.operator,
            state: self.state,
            optimized: self.optimized,
            monitored: self.monitored,
            reliability_margin: self.reliability_margin,
            thresholds: self.thresholds,
            nominal_voltage: self.nominal_voltage,
            i_max: self.i_max,
            loop_flow_threshold: self.loop_flow_threshold,
        })
    }

    fn check_threshold(&self, threshold: &BranchThreshold) -> CoreResult<()> {
        let side = threshold.side.index();
        if threshold.min.is_none() && threshold.max.is_none() {
            return Err(RaoError::Config(format!(
                "FlowCnec '{}': threshold on side {:?} has neither min nor max",
                self.id, threshold.side
            )));
        }
        match threshold.unit {
            Unit::Megawatt => {}
            Unit::Ampere if self.nominal_voltage[side].is_none() => {
                return Err(RaoError::Config(format!(
                    "FlowCnec '{}': ampere threshold on side {:?} requires a nominal voltage",
                    self.id, threshold.side
                )));
            }
            Unit::Ampere => {}
            Unit::PercentImax
                if self.i_max[side].is_none() || self.nominal_voltage[side].is_none() =>
            {
                return Err(RaoError::Config(format!(
                    "FlowCnec '{}': %Imax threshold on side {:?} requires Imax and nominal voltage",
                    self.id, threshold.side
                )));
            }
            Unit::PercentImax => {}
            other => {
                return Err(RaoError::Config(format!(
                    "FlowCnec '{}': unit {} cannot bound a flow",
                    self.id, other
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instant::{Instant, InstantKind};

    fn preventive() -> State {
        State::preventive(Instant::new("preventive", 0, InstantKind::Preventive))
    }

    #[test]
    fn test_neither_optimized_nor_monitored_is_rejected() {
        let result = FlowCnec::builder("cnec", "line", preventive())
            .optimized(false)
            .monitored(false)
            .threshold(BranchThreshold::symmetric(Side::One, Unit::Megawatt, 100.0))
            .build();
        assert!(matches!(result, Err(RaoError::Config(_))));
    }

    #[test]
    fn test_missing_threshold_is_rejected() {
        let result = FlowCnec::builder("cnec", "line", preventive()).build();
        assert!(matches!(result, Err(RaoError::Config(_))));
    }

    #[test]
    fn test_ampere_threshold_requires_voltage() {
        let result = FlowCnec::builder("cnec", "line", preventive())
            .threshold(BranchThreshold::symmetric(Side::One, Unit::Ampere, 1000.0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_margin_in_megawatt() {
        let cnec = FlowCnec::builder("cnec", "line", preventive())
            .threshold(BranchThreshold::asymmetric(
                Side::One,
                Unit::Megawatt,
                Some(-200.0),
                Some(100.0),
            ))
            .build()
            .unwrap();
        assert_eq!(cnec.compute_margin(60.0, Side::One, Unit::Megawatt), 40.0);
        assert_eq!(cnec.compute_margin(-150.0, Side::One, Unit::Megawatt), 50.0);
        assert_eq!(cnec.compute_margin(130.0, Side::One, Unit::Megawatt), -30.0);
    }

    #[test]
    fn test_most_restrictive_threshold_wins() {
        let cnec = FlowCnec::builder("cnec", "line", preventive())
            .threshold(BranchThreshold::symmetric(Side::One, Unit::Megawatt, 500.0))
            .threshold(BranchThreshold::asymmetric(
                Side::One,
                Unit::Megawatt,
                None,
                Some(300.0),
            ))
            .build()
            .unwrap();
        assert_eq!(cnec.upper_bound(Side::One, Unit::Megawatt), Some(300.0));
        assert_eq!(cnec.lower_bound(Side::One, Unit::Megawatt), Some(-500.0));
        assert_eq!(cnec.upper_bound(Side::Two, Unit::Megawatt), None);
        assert_eq!(cnec.monitored_sides(), vec![Side::One]);
    }

    #[test]
    fn test_reliability_margin_tightens_bounds() {
        let cnec = FlowCnec::builder("cnec", "line", preventive())
            .reliability_margin(20.0)
            .threshold(BranchThreshold::symmetric(Side::Two, Unit::Megawatt, 100.0))
            .build()
            .unwrap();
        assert_eq!(cnec.upper_bound(Side::Two, Unit::Megawatt), Some(80.0));
        assert_eq!(cnec.lower_bound(Side::Two, Unit::Megawatt), Some(-80.0));
    }

    #[test]
    fn test_percent_imax_conversion() {
        let cnec = FlowCnec::builder("cnec", "line", preventive())
            .nominal_voltages(400.0)
            .i_max(Side::One, 2000.0)
            .threshold(BranchThreshold::symmetric(Side::One, Unit::PercentImax, 50.0))
            .build()
            .unwrap();
        let upper_a = cnec.upper_bound(Side::One, Unit::Ampere).unwrap();
        assert!((upper_a - 1000.0).abs() < 1e-9);
        let upper_mw = cnec.upper_bound(Side::One, Unit::Megawatt).unwrap();
        assert!((upper_mw - 692.820_323).abs() < 1e-5);
    }

    #[test]
    fn test_undefined_flow_gives_nan_margin() {
        let cnec = FlowCnec::builder("cnec", "line", preventive())
            .threshold(BranchThreshold::symmetric(Side::One, Unit::Megawatt, 100.0))
            .build()
            .unwrap();
        assert!(cnec.compute_margin(f64::NAN, Side::One, Unit::Megawatt).is_nan());
        // MW threshold without nominal voltage cannot be read in amperes
        assert!(cnec
            .compute_margin(10.0, Side::One, Unit::Ampere)
            .is_nan());
    }

    #[test]
    fn test_largest_threshold() {
        let cnec = FlowCnec::builder("cnec", "line", preventive())
            .threshold(BranchThreshold::asymmetric(
                Side::One,
                Unit::Megawatt,
                Some(-700.0),
                Some(300.0),
            ))
            .build()
            .unwrap();
        assert_eq!(cnec.largest_threshold(Unit::Megawatt), 700.0);
    }
}

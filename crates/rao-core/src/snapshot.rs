//! In-memory implementations of the result contracts.
//!
//! Values are keyed by ids so a snapshot can be filled from any external
//! computation (or by hand in tests). Missing entries read as `NaN`; missing
//! setpoints read as the range action's initial setpoint.

use crate::cnec::{FlowCnec, Side};
use crate::remedial_action::{RangeAction, RemedialAction};
use crate::result::{
    worst_side_margin, worst_side_relative_margin, ComputationStatus, FlowResult,
    RangeActionActivationResult, SensitivityResult,
};
use crate::state::State;
use crate::units::Unit;
use std::collections::{BTreeSet, HashMap};

type SideKey = (String, Side, Unit);

#[derive(Debug, Clone, Default)]
pub struct FlowSnapshot {
    flows: HashMap<SideKey, f64>,
    commercial_flows: HashMap<SideKey, f64>,
    ptdf_zonal_sums: HashMap<(String, Side), f64>,
    /// Margins imposed directly, bypassing flows and thresholds
    margins: HashMap<(String, Unit), f64>,
    relative_margins: HashMap<(String, Unit), f64>,
}

impl FlowSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flow(mut self, cnec_id: &str, side: Side, unit: Unit, flow: f64) -> Self {
        self.flows.insert((cnec_id.to_string(), side, unit), flow);
        self
    }

    pub fn with_commercial_flow(mut self, cnec_id: &str, side: Side, unit: Unit, flow: f64) -> Self {
        self.commercial_flows
            .insert((cnec_id.to_string(), side, unit), flow);
        self
    }

    pub fn with_ptdf_zonal_sum(mut self, cnec_id: &str, side: Side, sum: f64) -> Self {
        self.ptdf_zonal_sums.insert((cnec_id.to_string(), side), sum);
        self
    }

    pub fn with_margin(mut self, cnec_id: &str, unit: Unit, margin: f64) -> Self {
        self.margins.insert((cnec_id.to_string(), unit), margin);
        self
    }

    pub fn with_relative_margin(mut self, cnec_id: &str, unit: Unit, margin: f64) -> Self {
        self.relative_margins
            .insert((cnec_id.to_string(), unit), margin);
        self
    }
}

impl FlowResult for FlowSnapshot {
    fn flow(&self, cnec: &FlowCnec, side: Side, unit: Unit) -> f64 {
        self.flows
            .get(&(cnec.id().to_string(), side, unit))
            .copied()
            .unwrap_or(f64::NAN)
    }

    fn commercial_flow(&self, cnec: &FlowCnec, side: Side, unit: Unit) -> f64 {
        self.commercial_flows
            .get(&(cnec.id().to_string(), side, unit))
            .copied()
            .unwrap_or(f64::NAN)
    }

    fn ptdf_zonal_sum(&self, cnec: &FlowCnec, side: Side) -> f64 {
        self.ptdf_zonal_sums
            .get(&(cnec.id().to_string(), side))
            .copied()
            .unwrap_or(f64::NAN)
    }

    fn margin(&self, cnec: &FlowCnec, unit: Unit) -> f64 {
        match self.margins.get(&(cnec.id().to_string(), unit)) {
            Some(margin) => *margin,
            None => worst_side_margin(self, cnec, unit),
        }
    }

    fn relative_margin(&self, cnec: &FlowCnec, unit: Unit) -> f64 {
        match self.relative_margins.get(&(cnec.id().to_string(), unit)) {
            Some(margin) => *margin,
            None => worst_side_relative_margin(self, cnec, unit),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SensitivitySnapshot {
    status: ComputationStatus,
    state_statuses: HashMap<String, ComputationStatus>,
    values: HashMap<(String, Side, String, Unit), f64>,
}

impl SensitivitySnapshot {
    pub fn new(status: ComputationStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_state_status(mut self, state_id: &str, status: ComputationStatus) -> Self {
        self.state_statuses.insert(state_id.to_string(), status);
        self
    }

    pub fn with_sensitivity(
        mut self,
        cnec_id: &str,
        side: Side,
        range_action_id: &str,
        unit: Unit,
        value: f64,
    ) -> Self {
        self.values.insert(
            (
                cnec_id.to_string(),
                side,
                range_action_id.to_string(),
                unit,
            ),
            value,
        );
        self
    }
}

impl SensitivityResult for SensitivitySnapshot {
    fn sensitivity_status(&self) -> ComputationStatus {
        self.status
    }

    /// Falls back to the global status for states without their own.
    fn sensitivity_status_for(&self, state: &State) -> ComputationStatus {
        self.state_statuses
            .get(state.id())
            .copied()
            .unwrap_or(self.status)
    }

    fn sensitivity_value(
        &self,
        cnec: &FlowCnec,
        side: Side,
        range_action: &RangeAction,
        unit: Unit,
    ) -> f64 {
        self.values
            .get(&(
                cnec.id().to_string(),
                side,
                range_action.id().to_string(),
                unit,
            ))
            .copied()
            .unwrap_or(f64::NAN)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivationSnapshot {
    setpoints: HashMap<(String, String), f64>,
}

impl ActivationSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setpoint(mut self, range_action_id: &str, state_id: &str, setpoint: f64) -> Self {
        self.setpoints
            .insert((range_action_id.to_string(), state_id.to_string()), setpoint);
        self
    }
}

impl RangeActionActivationResult for ActivationSnapshot {
    fn optimized_setpoint(&self, range_action: &RangeAction, state: &State) -> f64 {
        self.setpoints
            .get(&(range_action.id().to_string(), state.id().to_string()))
            .copied()
            .unwrap_or(range_action.initial_setpoint())
    }

    fn activated_range_actions(&self, state: &State) -> Vec<String> {
        self.setpoints
            .keys()
            .filter(|(_, state_id)| state_id == state.id())
            .map(|(ra_id, _)| ra_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnec::BranchThreshold;
    use crate::instant::{Instant, InstantKind};

    fn cnec() -> FlowCnec {
        let state = State::preventive(Instant::new("preventive", 0, InstantKind::Preventive));
        FlowCnec::builder("cnec", "line", state)
            .threshold(BranchThreshold::symmetric(Side::One, Unit::Megawatt, 100.0))
            .threshold(BranchThreshold::symmetric(Side::Two, Unit::Megawatt, 80.0))
            .build()
            .unwrap()
    }

    #[test]
    fn test_margin_is_worst_side() {
        let cnec = cnec();
        let flows = FlowSnapshot::new()
            .with_flow("cnec", Side::One, Unit::Megawatt, 50.0)
            .with_flow("cnec", Side::Two, Unit::Megawatt, -50.0);
        assert_eq!(flows.margin(&cnec, Unit::Megawatt), 30.0);
    }

    #[test]
    fn test_missing_side_flow_gives_nan() {
        let cnec = cnec();
        let flows = FlowSnapshot::new().with_flow("cnec", Side::One, Unit::Megawatt, 50.0);
        assert!(flows.margin(&cnec, Unit::Megawatt).is_nan());
    }

    #[test]
    fn test_margin_override() {
        let cnec = cnec();
        let flows = FlowSnapshot::new().with_margin("cnec", Unit::Megawatt, -12.0);
        assert_eq!(flows.margin(&cnec, Unit::Megawatt), -12.0);
        assert!(flows.margin(&cnec, Unit::Ampere).is_nan());
    }

    #[test]
    fn test_relative_margin_divides_positive_margins_only() {
        let cnec = cnec();
        let flows = FlowSnapshot::new()
            .with_flow("cnec", Side::One, Unit::Megawatt, 0.0)
            .with_flow("cnec", Side::Two, Unit::Megawatt, 0.0)
            .with_ptdf_zonal_sum("cnec", Side::One, 0.5)
            .with_ptdf_zonal_sum("cnec", Side::Two, 0.001);
        // side one: 100 / 0.5 = 200; side two: 80 / 0.01 (floored) = 8000
        assert_eq!(flows.relative_margin(&cnec, Unit::Megawatt), 200.0);

        let overloaded = FlowSnapshot::new()
            .with_flow("cnec", Side::One, Unit::Megawatt, 120.0)
            .with_flow("cnec", Side::Two, Unit::Megawatt, 0.0)
            .with_ptdf_zonal_sum("cnec", Side::One, 0.5)
            .with_ptdf_zonal_sum("cnec", Side::Two, 0.5);
        assert_eq!(overloaded.relative_margin(&cnec, Unit::Megawatt), -20.0);
    }

    #[test]
    fn test_loop_flow() {
        let cnec = cnec();
        let flows = FlowSnapshot::new()
            .with_flow("cnec", Side::One, Unit::Megawatt, 120.0)
            .with_commercial_flow("cnec", Side::One, Unit::Megawatt, 70.0);
        assert_eq!(flows.loop_flow(&cnec, Side::One, Unit::Megawatt), 50.0);
    }

    #[test]
    fn test_state_status_falls_back_to_global() {
        let prev = State::preventive(Instant::new("preventive", 0, InstantKind::Preventive));
        let sensi = SensitivitySnapshot::new(ComputationStatus::Fallback);
        assert_eq!(sensi.sensitivity_status_for(&prev), ComputationStatus::Fallback);
        let sensi = sensi.with_state_status("preventive", ComputationStatus::Failure);
        assert_eq!(sensi.sensitivity_status_for(&prev), ComputationStatus::Failure);
    }

    #[test]
    fn test_unset_setpoint_reads_initial() {
        let prev = State::preventive(Instant::new("preventive", 0, InstantKind::Preventive));
        let hvdc = RangeAction::hvdc("hvdc", "line", 250.0);
        let activation = ActivationSnapshot::new();
        assert_eq!(activation.optimized_setpoint(&hvdc, &prev), 250.0);
        let activation = activation.with_setpoint("hvdc", "preventive", 400.0);
        assert_eq!(activation.optimized_setpoint(&hvdc, &prev), 400.0);
        assert_eq!(activation.activated_range_actions(&prev), vec!["hvdc".to_string()]);
    }
}

//! Accumulates the outcome of an optimization run.
//!
//! Per state: which network actions were activated and which setpoints the
//! range actions were moved to. Per checkpoint: the cost breakdown of the
//! objective function at that point of the run.

use crate::objective::ObjectiveFunctionResult;
use rao_core::{
    ComputationStatus, CoreResult, NetworkAction, RangeAction, RangeActionActivationResult,
    RaoError, RemedialAction, State,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tracing::info;

/// Point of the run at which costs are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Checkpoint {
    /// Before any remedial action
    Initial,
    /// After optimizing the given instant
    After(String),
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Initial => write!(f, "initial"),
            Checkpoint::After(instant) => write!(f, "after {instant}"),
        }
    }
}

/// Functional cost and named virtual costs at one checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CostResult {
    functional_cost: f64,
    virtual_costs: BTreeMap<String, f64>,
}

impl CostResult {
    pub fn new(functional_cost: f64, virtual_costs: BTreeMap<String, f64>) -> Self {
        Self {
            functional_cost,
            virtual_costs,
        }
    }

    pub fn functional_cost(&self) -> f64 {
        self.functional_cost
    }

    /// Sum of the virtual costs; `NaN` as soon as one of them is.
    pub fn virtual_cost(&self) -> f64 {
        self.virtual_costs.values().sum()
    }

    /// `NaN` for a name that was not recorded.
    pub fn virtual_cost_of(&self, name: &str) -> f64 {
        self.virtual_costs.get(name).copied().unwrap_or(f64::NAN)
    }

    pub fn virtual_cost_names(&self) -> impl Iterator<Item = &str> {
        self.virtual_costs.keys().map(String::as_str)
    }

    pub fn cost(&self) -> f64 {
        self.functional_cost + self.virtual_cost()
    }
}

impl From<&ObjectiveFunctionResult> for CostResult {
    fn from(result: &ObjectiveFunctionResult) -> Self {
        let virtual_costs = result
            .virtual_cost_names()
            .into_iter()
            .map(|name| (name.to_string(), result.virtual_cost_of(name)))
            .collect();
        CostResult::new(result.functional_cost(), virtual_costs)
    }
}

#[derive(Debug, Clone)]
struct StateResult {
    state: State,
    network_actions: BTreeSet<String>,
    setpoints: BTreeMap<String, f64>,
}

impl StateResult {
    fn new(state: &State) -> Self {
        Self {
            state: state.clone(),
            network_actions: BTreeSet::new(),
            setpoints: BTreeMap::new(),
        }
    }
}

/// Remedial actions chosen per state and costs per checkpoint.
#[derive(Debug, Clone, Default)]
pub struct RaoResult {
    states: HashMap<State, StateResult>,
    costs: BTreeMap<Checkpoint, CostResult>,
    status: ComputationStatus,
}

impl RaoResult {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_result(&mut self, state: &State) -> &mut StateResult {
        self.states
            .entry(state.clone())
            .or_insert_with(|| StateResult::new(state))
    }

    pub fn activate_network_action(&mut self, state: &State, action: &NetworkAction) {
        self.state_result(state)
            .network_actions
            .insert(action.id().to_string());
    }

    /// Record the setpoint of `action` in `state`; a later call for the same
    /// pair replaces it.
    pub fn set_range_action_setpoint(&mut self, state: &State, action: &RangeAction, setpoint: f64) {
        self.state_result(state)
            .setpoints
            .insert(action.id().to_string(), setpoint);
    }

    pub fn is_activated(&self, state: &State, action: &NetworkAction) -> bool {
        self.states
            .get(state)
            .is_some_and(|r| r.network_actions.contains(action.id()))
    }

    /// Ids of the network actions activated in `state`, sorted.
    pub fn activated_network_actions(&self, state: &State) -> Vec<String> {
        self.states
            .get(state)
            .map(|r| r.network_actions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Setpoint recorded for `state`, else the one in force before it: the
    /// latest earlier state of the same contingency, then the preventive
    /// state, then the action's initial setpoint. Only states sharing the
    /// timestamp of `state` are considered.
    pub fn setpoint(&self, state: &State, action: &RangeAction) -> f64 {
        let mut candidates: Vec<&StateResult> = self
            .states
            .values()
            .filter(|r| {
                r.state.timestamp() == state.timestamp()
                    && r.state.contingency_id() == state.contingency_id()
                    && r.state.instant().order() <= state.instant().order()
            })
            .collect();
        candidates.sort_by_key(|r| std::cmp::Reverse(r.state.instant().order()));
        candidates
            .into_iter()
            .chain(
                self.states
                    .values()
                    .filter(|r| r.state.is_preventive() && r.state.timestamp() == state.timestamp()),
            )
            .find_map(|r| r.setpoints.get(action.id()).copied())
            .unwrap_or_else(|| action.initial_setpoint())
    }

    /// Record the costs of `result` at `checkpoint`. Each checkpoint is
    /// written once.
    pub fn record_objective(
        &mut self,
        checkpoint: Checkpoint,
        result: &ObjectiveFunctionResult,
    ) -> CoreResult<()> {
        self.record_cost(checkpoint, CostResult::from(result))
    }

    pub fn record_cost(&mut self, checkpoint: Checkpoint, cost: CostResult) -> CoreResult<()> {
        if self.costs.contains_key(&checkpoint) {
            return Err(RaoError::Validation(format!(
                "costs already recorded for checkpoint '{checkpoint}'"
            )));
        }
        info!(
            checkpoint = %checkpoint,
            cost = cost.cost(),
            functional_cost = cost.functional_cost(),
            virtual_cost = cost.virtual_cost(),
            "recorded costs"
        );
        self.costs.insert(checkpoint, cost);
        Ok(())
    }

    pub fn cost_result(&self, checkpoint: &Checkpoint) -> Option<&CostResult> {
        self.costs.get(checkpoint)
    }

    pub fn functional_cost(&self, checkpoint: &Checkpoint) -> f64 {
        self.cost_result(checkpoint)
            .map_or(f64::NAN, CostResult::functional_cost)
    }

    pub fn virtual_cost(&self, checkpoint: &Checkpoint) -> f64 {
        self.cost_result(checkpoint)
            .map_or(f64::NAN, CostResult::virtual_cost)
    }

    pub fn virtual_cost_of(&self, checkpoint: &Checkpoint, name: &str) -> f64 {
        self.cost_result(checkpoint)
            .map_or(f64::NAN, |c| c.virtual_cost_of(name))
    }

    pub fn cost(&self, checkpoint: &Checkpoint) -> f64 {
        self.cost_result(checkpoint).map_or(f64::NAN, CostResult::cost)
    }

    pub fn checkpoints(&self) -> impl Iterator<Item = &Checkpoint> {
        self.costs.keys()
    }

    pub fn computation_status(&self) -> ComputationStatus {
        self.status
    }

    pub fn set_computation_status(&mut self, status: ComputationStatus) {
        self.status = status;
    }
}

impl RangeActionActivationResult for RaoResult {
    fn optimized_setpoint(&self, range_action: &RangeAction, state: &State) -> f64 {
        self.setpoint(state, range_action)
    }

    fn activated_range_actions(&self, state: &State) -> Vec<String> {
        self.states
            .get(state)
            .map(|r| r.setpoints.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rao_core::test_fixtures::{sample_crac, CURATIVE, OUTAGE};
    use chrono::{TimeZone, Utc};
    use rao_core::Crac;

    fn crac() -> Crac {
        sample_crac().unwrap()
    }

    #[test]
    fn test_network_action_activation() {
        let crac = crac();
        let co1 = crac.state(Some("co1"), CURATIVE).unwrap();
        let co2 = crac.state(Some("co2"), CURATIVE).unwrap();
        let open = crac.network_action("open-line-4").unwrap();
        let close = crac.network_action("close-line-5").unwrap();

        let mut result = RaoResult::new();
        result.activate_network_action(co1, open);
        result.activate_network_action(co1, close);

        assert!(result.is_activated(co1, open));
        assert!(!result.is_activated(co2, open));
        assert_eq!(
            result.activated_network_actions(co1),
            vec!["close-line-5".to_string(), "open-line-4".to_string()]
        );
        assert!(result.activated_network_actions(co2).is_empty());
    }

    #[test]
    fn test_setpoint_falls_back_to_earlier_states() {
        let crac = crac();
        let preventive = crac.preventive_state().unwrap();
        let co1_outage = crac.state(Some("co1"), OUTAGE).unwrap();
        let co1_curative = crac.state(Some("co1"), CURATIVE).unwrap();
        let co2_curative = crac.state(Some("co2"), CURATIVE).unwrap();
        let pst = crac.range_action("pst-1").unwrap();

        let mut result = RaoResult::new();
        assert_eq!(result.setpoint(co1_curative, pst), pst.initial_setpoint());

        result.set_range_action_setpoint(preventive, pst, 2.0);
        result.set_range_action_setpoint(co1_outage, pst, 3.5);
        assert_eq!(result.setpoint(preventive, pst), 2.0);
        assert_eq!(result.setpoint(co1_curative, pst), 3.5);
        assert_eq!(result.setpoint(co2_curative, pst), 2.0);

        result.set_range_action_setpoint(co1_curative, pst, -1.0);
        assert_eq!(result.optimized_setpoint(pst, co1_curative), -1.0);
        assert_eq!(result.activated_range_actions(co1_curative), vec!["pst-1"]);
        assert!(result.activated_range_actions(co2_curative).is_empty());
    }

    #[test]
    fn test_timestamped_states_are_recorded_apart() {
        let crac = crac();
        let co1 = crac.state(Some("co1"), CURATIVE).unwrap();
        let morning = co1
            .clone()
            .with_timestamp(Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap());
        let evening = co1
            .clone()
            .with_timestamp(Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap());
        let open = crac.network_action("open-line-4").unwrap();
        let pst = crac.range_action("pst-1").unwrap();

        let mut result = RaoResult::new();
        result.activate_network_action(&morning, open);
        result.set_range_action_setpoint(&morning, pst, 2.5);

        assert!(result.is_activated(&morning, open));
        assert!(!result.is_activated(&evening, open));
        assert!(!result.is_activated(co1, open));
        assert_eq!(result.setpoint(&morning, pst), 2.5);
        assert_eq!(result.setpoint(&evening, pst), pst.initial_setpoint());
        assert!(result.activated_range_actions(&evening).is_empty());
    }

    #[test]
    fn test_costs_are_written_once() {
        let mut result = RaoResult::new();
        let costs = CostResult::new(
            -300.0,
            BTreeMap::from([("mnec-cost".to_string(), 1000.0), ("loop-flow-cost".to_string(), 100.0)]),
        );
        result.record_cost(Checkpoint::Initial, costs.clone()).unwrap();

        assert_eq!(result.functional_cost(&Checkpoint::Initial), -300.0);
        assert_eq!(result.virtual_cost(&Checkpoint::Initial), 1100.0);
        assert_eq!(result.virtual_cost_of(&Checkpoint::Initial, "mnec-cost"), 1000.0);
        assert_eq!(result.cost(&Checkpoint::Initial), 800.0);

        let err = result.record_cost(Checkpoint::Initial, costs).unwrap_err();
        assert!(matches!(err, RaoError::Validation(_)));
        assert_eq!(result.cost(&Checkpoint::Initial), 800.0);
    }

    #[test]
    fn test_undefined_costs_are_nan() {
        let mut result = RaoResult::new();
        let after_curative = Checkpoint::After(CURATIVE.to_string());
        assert!(result.cost(&after_curative).is_nan());
        assert!(result.functional_cost(&after_curative).is_nan());

        result
            .record_cost(after_curative.clone(), CostResult::new(10.0, BTreeMap::new()))
            .unwrap();
        assert_eq!(result.virtual_cost(&after_curative), 0.0);
        assert!(result.virtual_cost_of(&after_curative, "mnec-cost").is_nan());
        assert_eq!(result.checkpoints().count(), 1);
    }

    #[test]
    fn test_computation_status() {
        let mut result = RaoResult::new();
        assert_eq!(result.computation_status(), ComputationStatus::Default);
        result.set_computation_status(ComputationStatus::Fallback);
        assert_eq!(result.computation_status(), ComputationStatus::Fallback);
    }

    #[test]
    fn test_checkpoint_display() {
        assert_eq!(Checkpoint::Initial.to_string(), "initial");
        assert_eq!(
            Checkpoint::After("curative".to_string()).to_string(),
            "after curative"
        );
    }
}

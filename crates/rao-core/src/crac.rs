//! The CRAC catalog: contingencies, remedial actions and constraints.
//!
//! A [`Crac`] is assembled once, single-threaded, through its `add_*`
//! methods, each of which validates eagerly and rejects inconsistent input
//! with a [`RaoError`]. Once handed to an optimization run (typically
//! behind an `Arc`), it is read-only.
//!
//! ## Timeline rules
//!
//! - the first instant is the preventive one, the second the outage one;
//! - exactly one instant of each of those kinds exists;
//! - automatic instants precede curative ones;
//! - orders are assigned sequentially, hence unique.
//!
//! ## State rules
//!
//! - the preventive state is created with the preventive instant;
//! - at most one state exists per (contingency, instant) pair;
//! - no post-contingency state exists at the preventive instant.

use crate::cnec::FlowCnec;
use crate::contingency::Contingency;
use crate::diagnostics::Diagnostics;
use crate::error::{CoreResult, RaoError};
use crate::instant::{Instant, InstantKind};
use crate::remedial_action::{NetworkAction, RangeAction, RemedialAction, UsageMethod, UsageRule};
use crate::state::State;
use crate::usage_limits::RaUsageLimits;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Crac {
    id: String,
    instants: Vec<Instant>,
    contingencies: Vec<Arc<Contingency>>,
    contingency_index: HashMap<String, usize>,
    states: Vec<State>,
    state_index: HashMap<String, usize>,
    flow_cnecs: Vec<Arc<FlowCnec>>,
    cnec_index: HashMap<String, usize>,
    network_actions: Vec<Arc<NetworkAction>>,
    network_action_index: HashMap<String, usize>,
    range_actions: Vec<Arc<RangeAction>>,
    range_action_index: HashMap<String, usize>,
    ra_usage_limits: HashMap<String, RaUsageLimits>,
}

impl Crac {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instants: Vec::new(),
            contingencies: Vec::new(),
            contingency_index: HashMap::new(),
            states: Vec::new(),
            state_index: HashMap::new(),
            flow_cnecs: Vec::new(),
            cnec_index: HashMap::new(),
            network_actions: Vec::new(),
            network_action_index: HashMap::new(),
            range_actions: Vec::new(),
            range_action_index: HashMap::new(),
            ra_usage_limits: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    // =========================================================================
    // Instants
    // =========================================================================

    /// Append an instant at the end of the timeline.
    pub fn add_instant(&mut self, id: impl Into<String>, kind: InstantKind) -> CoreResult<Instant> {
        let id = id.into();
        if self.instants.iter().any(|i| i.id() == id) {
            return Err(RaoError::Config(format!("instant '{id}' already exists")));
        }
        match (self.instants.len(), kind) {
            (0, InstantKind::Preventive) | (1, InstantKind::Outage) => {}
            (0, _) => {
                return Err(RaoError::Config(format!(
                    "the first instant must be PREVENTIVE, got {kind} for '{id}'"
                )))
            }
            (1, _) => {
                return Err(RaoError::Config(format!(
                    "the second instant must be OUTAGE, got {kind} for '{id}'"
                )))
            }
            (_, InstantKind::Preventive | InstantKind::Outage) => {
                return Err(RaoError::Config(format!(
                    "a CRAC holds exactly one {kind} instant, cannot add '{id}'"
                )))
            }
            (_, InstantKind::Auto) if self.instants.iter().any(Instant::is_curative) => {
                return Err(RaoError::Config(format!(
                    "AUTO instant '{id}' cannot follow a CURATIVE instant"
                )))
            }
            _ => {}
        }

        let instant = Instant::new(id, self.instants.len() as u32, kind);
        self.instants.push(instant.clone());
        if kind == InstantKind::Preventive {
            self.register_state(State::preventive(instant.clone()));
        }
        Ok(instant)
    }

    /// All instants, in timeline order.
    pub fn instants(&self) -> &[Instant] {
        &self.instants
    }

    pub fn instant(&self, id: &str) -> CoreResult<&Instant> {
        self.instants
            .iter()
            .find(|i| i.id() == id)
            .ok_or_else(|| RaoError::not_found("Instant", id))
    }

    pub fn preventive_instant(&self) -> CoreResult<&Instant> {
        self.instants
            .iter()
            .find(|i| i.is_preventive())
            .ok_or_else(|| RaoError::not_found("Instant", "<preventive>"))
    }

    pub fn outage_instant(&self) -> CoreResult<&Instant> {
        self.instants
            .iter()
            .find(|i| i.is_outage())
            .ok_or_else(|| RaoError::not_found("Instant", "<outage>"))
    }

    pub fn last_instant(&self) -> Option<&Instant> {
        self.instants.last()
    }

    pub fn instants_of_kind(&self, kind: InstantKind) -> Vec<&Instant> {
        self.instants.iter().filter(|i| i.kind() == kind).collect()
    }

    /// The instant right before `id` on the timeline.
    pub fn previous_instant(&self, id: &str) -> CoreResult<Option<&Instant>> {
        let order = self.instant(id)?.order() as usize;
        Ok(order.checked_sub(1).and_then(|prev| self.instants.get(prev)))
    }

    // =========================================================================
    // Contingencies & states
    // =========================================================================

    pub fn add_contingency(&mut self, contingency: Contingency) -> CoreResult<Arc<Contingency>> {
        if self.contingency_index.contains_key(contingency.id()) {
            return Err(RaoError::Config(format!(
                "contingency '{}' already exists",
                contingency.id()
            )));
        }
        let contingency = Arc::new(contingency);
        self.contingency_index
            .insert(contingency.id().to_string(), self.contingencies.len());
        self.contingencies.push(Arc::clone(&contingency));
        Ok(contingency)
    }

    pub fn contingencies(&self) -> &[Arc<Contingency>] {
        &self.contingencies
    }

    pub fn contingency(&self, id: &str) -> Option<&Contingency> {
        self.contingency_index
            .get(id)
            .map(|idx| self.contingencies[*idx].as_ref())
    }

    /// Get or create the state following `contingency_id` at `instant_id`.
    pub fn add_state(&mut self, contingency_id: &str, instant_id: &str) -> CoreResult<State> {
        let instant = self.instant(instant_id)?.clone();
        if instant.is_preventive() {
            return Err(RaoError::Config(format!(
                "contingency '{contingency_id}' cannot have a state at preventive instant '{instant_id}'"
            )));
        }
        let contingency = self
            .contingency_index
            .get(contingency_id)
            .map(|idx| Arc::clone(&self.contingencies[*idx]))
            .ok_or_else(|| RaoError::not_found("Contingency", contingency_id))?;

        if let Some(existing) = self.state(Some(contingency_id), instant_id) {
            return Ok(existing.clone());
        }
        let state = State::post_contingency(instant, contingency);
        self.register_state(state.clone());
        Ok(state)
    }

    fn register_state(&mut self, state: State) {
        self.state_index
            .insert(state.id().to_string(), self.states.len());
        self.states.push(state);
    }

    pub fn preventive_state(&self) -> CoreResult<&State> {
        self.states
            .iter()
            .find(|s| s.is_preventive())
            .ok_or_else(|| RaoError::not_found("State", "<preventive>"))
    }

    /// The state of (`contingency_id`, `instant_id`); `None` contingency
    /// designates the preventive state.
    pub fn state(&self, contingency_id: Option<&str>, instant_id: &str) -> Option<&State> {
        self.states
            .iter()
            .find(|s| s.contingency_id() == contingency_id && s.instant().id() == instant_id)
    }

    pub fn state_by_id(&self, state_id: &str) -> Option<&State> {
        self.state_index.get(state_id).map(|idx| &self.states[*idx])
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// States following one contingency, in timeline order.
    pub fn states_of_contingency(&self, contingency_id: &str) -> Vec<&State> {
        let mut states: Vec<&State> = self
            .states
            .iter()
            .filter(|s| s.contingency_id() == Some(contingency_id))
            .collect();
        states.sort_by_key(|s| s.instant().order());
        states
    }

    // =========================================================================
    // CNECs
    // =========================================================================

    pub fn add_flow_cnec(&mut self, cnec: FlowCnec) -> CoreResult<Arc<FlowCnec>> {
        if self.cnec_index.contains_key(cnec.id()) {
            return Err(RaoError::Config(format!(
                "FlowCnec '{}' already exists",
                cnec.id()
            )));
        }
        match self.state_by_id(cnec.state().id()) {
            Some(state) if state == cnec.state() => {}
            _ => {
                return Err(RaoError::Validation(format!(
                    "FlowCnec '{}' refers to state '{}' which does not belong to CRAC '{}'",
                    cnec.id(),
                    cnec.state().id(),
                    self.id
                )))
            }
        }
        let cnec = Arc::new(cnec);
        self.cnec_index
            .insert(cnec.id().to_string(), self.flow_cnecs.len());
        self.flow_cnecs.push(Arc::clone(&cnec));
        Ok(cnec)
    }

    /// All flow CNECs, in insertion order.
    pub fn flow_cnecs(&self) -> &[Arc<FlowCnec>] {
        &self.flow_cnecs
    }

    pub fn flow_cnec(&self, id: &str) -> Option<&FlowCnec> {
        self.cnec_index.get(id).map(|idx| self.flow_cnecs[*idx].as_ref())
    }

    pub fn flow_cnecs_of_state(&self, state: &State) -> Vec<Arc<FlowCnec>> {
        self.flow_cnecs
            .iter()
            .filter(|c| c.state() == state)
            .cloned()
            .collect()
    }

    // =========================================================================
    // Remedial actions
    // =========================================================================

    pub fn add_network_action(&mut self, action: NetworkAction) -> CoreResult<Arc<NetworkAction>> {
        self.check_remedial_action(&action)?;
        let action = Arc::new(action);
        self.network_action_index
            .insert(action.id().to_string(), self.network_actions.len());
        self.network_actions.push(Arc::clone(&action));
        Ok(action)
    }

    pub fn add_range_action(&mut self, action: RangeAction) -> CoreResult<Arc<RangeAction>> {
        self.check_remedial_action(&action)?;
        let action = Arc::new(action);
        self.range_action_index
            .insert(action.id().to_string(), self.range_actions.len());
        self.range_actions.push(Arc::clone(&action));
        Ok(action)
    }

    fn check_remedial_action(&self, action: &dyn RemedialAction) -> CoreResult<()> {
        let id = action.id();
        if self.network_action_index.contains_key(id) || self.range_action_index.contains_key(id) {
            return Err(RaoError::Config(format!(
                "remedial action '{id}' already exists"
            )));
        }
        for rule in action.usage_rules() {
            let instant = self.instant(rule.instant_id())?;
            if instant.is_outage() {
                return Err(RaoError::Config(format!(
                    "remedial action '{id}' cannot be used at outage instant '{}'",
                    instant.id()
                )));
            }
            match rule {
                UsageRule::OnInstant { .. } => {}
                UsageRule::OnContingencyState { contingency_id, .. } => {
                    if instant.is_preventive() {
                        return Err(RaoError::Config(format!(
                            "remedial action '{id}': contingency usage rule at preventive instant"
                        )));
                    }
                    if self.contingency(contingency_id).is_none() {
                        return Err(RaoError::not_found("Contingency", contingency_id.as_str()));
                    }
                }
                UsageRule::OnConstraint { cnec_id, .. } => {
                    if self.flow_cnec(cnec_id).is_none() {
                        return Err(RaoError::not_found("FlowCnec", cnec_id.as_str()));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn network_actions(&self) -> &[Arc<NetworkAction>] {
        &self.network_actions
    }

    pub fn range_actions(&self) -> &[Arc<RangeAction>] {
        &self.range_actions
    }

    pub fn network_action(&self, id: &str) -> Option<&NetworkAction> {
        self.network_action_index
            .get(id)
            .map(|idx| self.network_actions[*idx].as_ref())
    }

    pub fn range_action(&self, id: &str) -> Option<&RangeAction> {
        self.range_action_index
            .get(id)
            .map(|idx| self.range_actions[*idx].as_ref())
    }

    /// Network actions the optimizer may choose to activate in `state`.
    pub fn available_network_actions(&self, state: &State) -> Vec<Arc<NetworkAction>> {
        self.network_actions
            .iter()
            .filter(|na| na.usage_method(state, self).is_potentially_available())
            .cloned()
            .collect()
    }

    /// Network actions that must be activated in `state`.
    pub fn forced_network_actions(&self, state: &State) -> Vec<Arc<NetworkAction>> {
        self.network_actions
            .iter()
            .filter(|na| na.usage_method(state, self) == UsageMethod::Forced)
            .cloned()
            .collect()
    }

    /// Range actions the optimizer may move in `state`.
    pub fn available_range_actions(&self, state: &State) -> Vec<Arc<RangeAction>> {
        self.range_actions
            .iter()
            .filter(|ra| ra.usage_method(state, self).is_potentially_available())
            .cloned()
            .collect()
    }

    // =========================================================================
    // Usage limits
    // =========================================================================

    pub fn set_ra_usage_limits(&mut self, instant_id: &str, limits: RaUsageLimits) -> CoreResult<()> {
        self.instant(instant_id)?;
        self.ra_usage_limits.insert(instant_id.to_string(), limits);
        Ok(())
    }

    pub fn ra_usage_limits(&self, instant_id: &str) -> Option<&RaUsageLimits> {
        self.ra_usage_limits.get(instant_id)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Legal but suspicious content of the catalog.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();

        if self.instants.len() < 2 {
            diag.add_error_with_entity(
                "timeline",
                "a CRAC needs a preventive and an outage instant",
                &self.id,
            );
        }

        let monitored_states: HashSet<&str> =
            self.flow_cnecs.iter().map(|c| c.state().id()).collect();
        for state in &self.states {
            if !monitored_states.contains(state.id()) {
                diag.add_warning_with_entity("coverage", "state has no CNEC", state.id());
            }
        }

        let contingencies_with_state: HashSet<&str> =
            self.states.iter().filter_map(State::contingency_id).collect();
        for contingency in &self.contingencies {
            if !contingencies_with_state.contains(contingency.id()) {
                diag.add_warning_with_entity(
                    "coverage",
                    "contingency has no post-contingency state",
                    contingency.id(),
                );
            }
        }

        for na in &self.network_actions {
            if na.usage_rules().is_empty() {
                diag.add_warning_with_entity("usage", "remedial action has no usage rule", na.id());
            }
        }
        for ra in &self.range_actions {
            if ra.usage_rules().is_empty() {
                diag.add_warning_with_entity("usage", "remedial action has no usage rule", ra.id());
            }
            let (min, max) = ra.admissible_range(ra.initial_setpoint());
            if min.is_nan() || max.is_nan() || min > max {
                diag.add_error_with_entity("range", "admissible range is empty", ra.id());
            }
        }

        diag
    }
}

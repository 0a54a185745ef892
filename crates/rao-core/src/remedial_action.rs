//! Remedial actions and the usage rules binding them to states.
//!
//! Two families exist:
//!
//! - [`NetworkAction`]: discrete, either activated or not in a state
//!   (topological switching, fixed PST tap, injection setpoint).
//! - [`RangeAction`]: continuous setpoint within an admissible range
//!   (PST angle, HVDC setpoint, injection, counter-trading).
//!
//! Whether an action may be used in a state is decided by its
//! [`UsageRule`]s. When several rules apply to the same state the strongest
//! [`UsageMethod`] wins:
//!
//! ```text
//! UNAVAILABLE > FORCED > AVAILABLE > TO_BE_EVALUATED > UNDEFINED
//! ```

use crate::crac::Crac;
use crate::error::{CoreResult, RaoError};
use crate::state::State;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a remedial action may be used in a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageMethod {
    Available,
    Forced,
    Unavailable,
    ToBeEvaluated,
    Undefined,
}

impl UsageMethod {
    fn strength(self) -> u8 {
        match self {
            UsageMethod::Unavailable => 4,
            UsageMethod::Forced => 3,
            UsageMethod::Available => 2,
            UsageMethod::ToBeEvaluated => 1,
            UsageMethod::Undefined => 0,
        }
    }

    /// Strongest method of the iterator, `Undefined` when empty.
    pub fn strongest(methods: impl IntoIterator<Item = UsageMethod>) -> UsageMethod {
        methods
            .into_iter()
            .max_by_key(|m| m.strength())
            .unwrap_or(UsageMethod::Undefined)
    }

    /// Usable by the optimizer, as opposed to forced or excluded.
    pub fn is_potentially_available(self) -> bool {
        matches!(self, UsageMethod::Available | UsageMethod::ToBeEvaluated)
    }
}

/// Binds a remedial action to the states where it may be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UsageRule {
    /// Every state of the instant
    OnInstant {
        instant_id: String,
        method: UsageMethod,
    },
    /// The single state (contingency, instant)
    OnContingencyState {
        contingency_id: String,
        instant_id: String,
        method: UsageMethod,
    },
    /// States of the instant that can influence the given CNEC
    OnConstraint {
        cnec_id: String,
        instant_id: String,
        method: UsageMethod,
    },
}

impl UsageRule {
    pub fn on_instant(instant_id: impl Into<String>, method: UsageMethod) -> Self {
        UsageRule::OnInstant {
            instant_id: instant_id.into(),
            method,
        }
    }

    pub fn on_contingency_state(
        contingency_id: impl Into<String>,
        instant_id: impl Into<String>,
        method: UsageMethod,
    ) -> Self {
        UsageRule::OnContingencyState {
            contingency_id: contingency_id.into(),
            instant_id: instant_id.into(),
            method,
        }
    }

    pub fn on_constraint(
        cnec_id: impl Into<String>,
        instant_id: impl Into<String>,
        method: UsageMethod,
    ) -> Self {
        UsageRule::OnConstraint {
            cnec_id: cnec_id.into(),
            instant_id: instant_id.into(),
            method,
        }
    }

    pub fn instant_id(&self) -> &str {
        match self {
            UsageRule::OnInstant { instant_id, .. }
            | UsageRule::OnContingencyState { instant_id, .. }
            | UsageRule::OnConstraint { instant_id, .. } => instant_id,
        }
    }

    pub fn method(&self) -> UsageMethod {
        match self {
            UsageRule::OnInstant { method, .. }
            | UsageRule::OnContingencyState { method, .. }
            | UsageRule::OnConstraint { method, .. } => *method,
        }
    }

    pub fn applies_to(&self, state: &State, crac: &Crac) -> bool {
        if state.instant().id() != self.instant_id() {
            return false;
        }
        match self {
            UsageRule::OnInstant { .. } => true,
            UsageRule::OnContingencyState { contingency_id, .. } => {
                state.contingency_id() == Some(contingency_id.as_str())
            }
            UsageRule::OnConstraint { cnec_id, .. } => match crac.flow_cnec(cnec_id) {
                Some(cnec) => {
                    let same_scenario = state.is_preventive()
                        || cnec.state().contingency_id() == state.contingency_id();
                    same_scenario && !cnec.state().instant().comes_before(state.instant())
                }
                None => false,
            },
        }
    }
}

/// Behaviour shared by both remedial-action families.
pub trait RemedialAction {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn operator(&self) -> Option<&str>;

    fn usage_rules(&self) -> &[UsageRule];

    /// Strongest usage method among the rules applying to `state`.
    fn usage_method(&self, state: &State, crac: &Crac) -> UsageMethod {
        UsageMethod::strongest(
            self.usage_rules()
                .iter()
                .filter(|rule| rule.applies_to(state, crac))
                .map(UsageRule::method),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Open,
    Close,
}

/// One atomic modification of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementaryAction {
    Topology {
        network_element_id: String,
        action: ActionType,
    },
    SwitchPair {
        switch_to_open: String,
        switch_to_close: String,
    },
    PstSetpoint {
        network_element_id: String,
        tap: i32,
    },
    InjectionSetpoint {
        network_element_id: String,
        setpoint: f64,
        unit: Unit,
    },
}

/// Discrete remedial action, activated or not in a state.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkAction {
    id: String,
    name: Option<String>,
    operator: Option<String>,
    usage_rules: Vec<UsageRule>,
    elementary_actions: Vec<ElementaryAction>,
}

impl NetworkAction {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            operator: None,
            usage_rules: Vec::new(),
            elementary_actions: Vec::new(),
        }
    }

    /// Convenience constructor for a single-switch topological action.
    pub fn topological(
        id: impl Into<String>,
        network_element_id: impl Into<String>,
        action: ActionType,
    ) -> Self {
        Self::new(id).with_elementary_action(ElementaryAction::Topology {
            network_element_id: network_element_id.into(),
            action,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_usage_rule(mut self, rule: UsageRule) -> Self {
        self.usage_rules.push(rule);
        self
    }

    pub fn with_elementary_action(mut self, action: ElementaryAction) -> Self {
        self.elementary_actions.push(action);
        self
    }

    pub fn elementary_actions(&self) -> &[ElementaryAction] {
        &self.elementary_actions
    }

    /// Only switching, no setpoint change.
    pub fn is_topological(&self) -> bool {
        !self.elementary_actions.is_empty()
            && self.elementary_actions.iter().all(|a| {
                matches!(
                    a,
                    ElementaryAction::Topology { .. } | ElementaryAction::SwitchPair { .. }
                )
            })
    }
}

impl RemedialAction for NetworkAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    fn usage_rules(&self) -> &[UsageRule] {
        &self.usage_rules
    }
}

/// Reference point of a [`StandardRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeType {
    Absolute,
    RelativeToInitialNetwork,
    RelativeToPreviousInstant,
}

/// Admissible interval, in taps for PSTs and in setpoint units otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardRange {
    pub min: f64,
    pub max: f64,
    pub range_type: RangeType,
}

impl StandardRange {
    pub fn new(min: f64, max: f64, range_type: RangeType) -> Self {
        Self {
            min,
            max,
            range_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeActionKind {
    /// Phase-shifting transformer; setpoints are angles in degrees
    Pst {
        tap_to_angle: BTreeMap<i32, f64>,
        initial_tap: i32,
    },
    Hvdc,
    Injection,
    CounterTrade,
}

/// Continuous remedial action with an admissible setpoint range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeAction {
    id: String,
    name: Option<String>,
    operator: Option<String>,
    usage_rules: Vec<UsageRule>,
    network_element_id: String,
    group_id: Option<String>,
    kind: RangeActionKind,
    ranges: Vec<StandardRange>,
    initial_setpoint: f64,
}

impl RangeAction {
    /// A PST whose setpoint is the angle of its current tap.
    pub fn pst(
        id: impl Into<String>,
        network_element_id: impl Into<String>,
        tap_to_angle: BTreeMap<i32, f64>,
        initial_tap: i32,
    ) -> CoreResult<Self> {
        let id = id.into();
        let initial_setpoint = *tap_to_angle.get(&initial_tap).ok_or_else(|| {
            RaoError::Config(format!(
                "PST '{id}': initial tap {initial_tap} is not in its tap-to-angle table"
            ))
        })?;
        Ok(Self::new(
            id,
            network_element_id,
            RangeActionKind::Pst {
                tap_to_angle,
                initial_tap,
            },
            initial_setpoint,
        ))
    }

    pub fn hvdc(
        id: impl Into<String>,
        network_element_id: impl Into<String>,
        initial_setpoint: f64,
    ) -> Self {
        Self::new(
            id.into(),
            network_element_id,
            RangeActionKind::Hvdc,
            initial_setpoint,
        )
    }

    pub fn injection(
        id: impl Into<String>,
        network_element_id: impl Into<String>,
        initial_setpoint: f64,
    ) -> Self {
        Self::new(
            id.into(),
            network_element_id,
            RangeActionKind::Injection,
            initial_setpoint,
        )
    }

    fn new(
        id: String,
        network_element_id: impl Into<String>,
        kind: RangeActionKind,
        initial_setpoint: f64,
    ) -> Self {
        Self {
            id,
            name: None,
            operator: None,
            usage_rules: Vec::new(),
            network_element_id: network_element_id.into(),
            group_id: None,
            kind,
            ranges: Vec::new(),
            initial_setpoint,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn with_usage_rule(mut self, rule: UsageRule) -> Self {
        self.usage_rules.push(rule);
        self
    }

    /// Actions sharing a group id must take the same setpoint.
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_range(mut self, range: StandardRange) -> Self {
        self.ranges.push(range);
        self
    }

    pub fn network_element_id(&self) -> &str {
        &self.network_element_id
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn kind(&self) -> &RangeActionKind {
        &self.kind
    }

    pub fn ranges(&self) -> &[StandardRange] {
        &self.ranges
    }

    pub fn initial_setpoint(&self) -> f64 {
        self.initial_setpoint
    }

    pub fn is_pst(&self) -> bool {
        matches!(self.kind, RangeActionKind::Pst { .. })
    }

    /// Angle of a PST tap, `None` for other kinds or unknown taps.
    pub fn tap_to_angle(&self, tap: i32) -> Option<f64> {
        match &self.kind {
            RangeActionKind::Pst { tap_to_angle, .. } => tap_to_angle.get(&tap).copied(),
            _ => None,
        }
    }

    /// Tap whose angle is closest to `angle`.
    pub fn angle_to_tap(&self, angle: f64) -> Option<i32> {
        if angle.is_nan() {
            return None;
        }
        match &self.kind {
            RangeActionKind::Pst { tap_to_angle, .. } => tap_to_angle
                .iter()
                .min_by(|(_, a), (_, b)| (*a - angle).abs().total_cmp(&(*b - angle).abs()))
                .map(|(tap, _)| *tap),
            _ => None,
        }
    }

    pub fn min_admissible_setpoint(&self, previous_setpoint: f64) -> f64 {
        self.admissible_range(previous_setpoint).0
    }

    pub fn max_admissible_setpoint(&self, previous_setpoint: f64) -> f64 {
        self.admissible_range(previous_setpoint).1
    }

    /// Intersection of all ranges, as setpoints.
    ///
    /// An empty intersection yields `min > max`; PST bounds outside the tap
    /// table yield `NaN`.
    pub fn admissible_range(&self, previous_setpoint: f64) -> (f64, f64) {
        match &self.kind {
            RangeActionKind::Pst {
                tap_to_angle,
                initial_tap,
            } => {
                let (Some(first), Some(last)) = (
                    tap_to_angle.keys().next().copied(),
                    tap_to_angle.keys().next_back().copied(),
                ) else {
                    return (f64::NAN, f64::NAN);
                };
                let previous_tap = self
                    .angle_to_tap(previous_setpoint)
                    .unwrap_or(*initial_tap);
                let (lo, hi) = self.intersect_ranges(
                    first as f64,
                    last as f64,
                    *initial_tap as f64,
                    previous_tap as f64,
                );
                let lo_angle = tap_to_angle
                    .range(lo.ceil() as i32..)
                    .next()
                    .map_or(f64::NAN, |(_, angle)| *angle);
                let hi_angle = tap_to_angle
                    .range(..=hi.floor() as i32)
                    .next_back()
                    .map_or(f64::NAN, |(_, angle)| *angle);
                // Angles may decrease with taps
                if lo_angle <= hi_angle {
                    (lo_angle, hi_angle)
                } else {
                    (hi_angle, lo_angle)
                }
            }
            _ => self.intersect_ranges(
                f64::NEG_INFINITY,
                f64::INFINITY,
                self.initial_setpoint,
                previous_setpoint,
            ),
        }
    }

    fn intersect_ranges(&self, lo: f64, hi: f64, initial: f64, previous: f64) -> (f64, f64) {
        self.ranges.iter().fold((lo, hi), |(lo, hi), range| {
            let offset = match range.range_type {
                RangeType::Absolute => 0.0,
                RangeType::RelativeToInitialNetwork => initial,
                RangeType::RelativeToPreviousInstant => previous,
            };
            (lo.max(range.min + offset), hi.min(range.max + offset))
        })
    }
}

impl RemedialAction for RangeAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    fn usage_rules(&self) -> &[UsageRule] {
        &self.usage_rules
    }
}

/// Borrowed view over either remedial-action family.
#[derive(Debug, Clone, Copy)]
pub enum RemedialActionRef<'a> {
    Network(&'a NetworkAction),
    Range(&'a RangeAction),
}

impl<'a> RemedialActionRef<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            RemedialActionRef::Network(na) => &na.id,
            RemedialActionRef::Range(ra) => &ra.id,
        }
    }

    pub fn operator(&self) -> Option<&'a str> {
        match *self {
            RemedialActionRef::Network(na) => na.operator.as_deref(),
            RemedialActionRef::Range(ra) => ra.operator.as_deref(),
        }
    }

    pub fn is_topological(&self) -> bool {
        matches!(self, RemedialActionRef::Network(na) if na.is_topological())
    }

    pub fn is_pst(&self) -> bool {
        matches!(self, RemedialActionRef::Range(ra) if ra.is_pst())
    }

    /// Elementary actions of a network action; a range action counts as one.
    pub fn elementary_action_count(&self) -> usize {
        match self {
            RemedialActionRef::Network(na) => na.elementary_actions.len(),
            RemedialActionRef::Range(_) => 1,
        }
    }
}

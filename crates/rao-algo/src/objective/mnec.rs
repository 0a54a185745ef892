use super::{in_scope, nan_aware_sum, nan_last, CostEvaluator, CostEvaluatorResult};
use crate::input::EvaluationInput;
use crate::parameters::MnecParameters;
use rao_core::{FlowCnec, FlowResult, Unit};
use std::collections::HashSet;
use std::sync::Arc;

/// Virtual cost of margin lost on monitored CNECs (MNECs).
///
/// An MNEC may lose up to `acceptable_margin_decrease` MW of margin with
/// respect to the initial situation; beyond that, every MW costs
/// `violation_cost`:
///
/// ```text
/// degradation = max(0, (initial margin - current margin) - acceptable decrease)
/// cost        = Σ violation_cost × degradation
/// ```
pub struct MnecViolationCostEvaluator {
    cnecs: Vec<Arc<FlowCnec>>,
    initial_flows: Arc<dyn FlowResult>,
    unit: Unit,
    acceptable_margin_decrease: f64,
    violation_cost: f64,
}

impl MnecViolationCostEvaluator {
    pub const NAME: &'static str = "mnec-cost";

    /// Only the monitored CNECs of `cnecs` are kept.
    pub fn new(
        cnecs: impl IntoIterator<Item = Arc<FlowCnec>>,
        initial_flows: Arc<dyn FlowResult>,
        unit: Unit,
        parameters: &MnecParameters,
    ) -> Self {
        Self {
            cnecs: cnecs.into_iter().filter(|c| c.is_monitored()).collect(),
            initial_flows,
            unit,
            acceptable_margin_decrease: parameters.acceptable_margin_decrease,
            violation_cost: parameters.violation_cost,
        }
    }

    /// Degradation beyond the acceptable decrease, in MW.
    fn degradation(&self, input: &EvaluationInput<'_>, cnec: &FlowCnec) -> f64 {
        let initial = self.initial_flows.margin(cnec, self.unit);
        let current = input.flow.margin(cnec, self.unit);
        let decrease = self.to_megawatts(cnec, initial - current);
        if decrease.is_nan() {
            return f64::NAN;
        }
        (decrease - self.acceptable_margin_decrease).max(0.0)
    }

    fn to_megawatts(&self, cnec: &FlowCnec, value: f64) -> f64 {
        if self.unit == Unit::Megawatt {
            return value;
        }
        match cnec.monitored_sides().first() {
            Some(side) => cnec.convert(value, self.unit, Unit::Megawatt, *side),
            None => f64::NAN,
        }
    }
}

impl CostEvaluator for MnecViolationCostEvaluator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn unit(&self) -> Unit {
        self.unit
    }

    fn compute_cost_and_limiting_elements(
        &self,
        input: &EvaluationInput<'_>,
        excluded_contingencies: &HashSet<String>,
    ) -> CostEvaluatorResult {
        let mut degradations: Vec<(Arc<FlowCnec>, f64)> = self
            .cnecs
            .iter()
            .filter(|cnec| in_scope(cnec, excluded_contingencies))
            .map(|cnec| (Arc::clone(cnec), self.degradation(input, cnec)))
            .collect();

        let cost = nan_aware_sum(degradations.iter().map(|(_, d)| self.violation_cost * d));

        degradations.retain(|(_, d)| *d > 0.0);
        degradations.sort_by(|(_, a), (_, b)| nan_last(*b, *a));
        CostEvaluatorResult::new(
            cost,
            degradations.into_iter().map(|(cnec, _)| cnec).collect(),
        )
    }
}

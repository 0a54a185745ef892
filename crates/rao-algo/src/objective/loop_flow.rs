use super::{in_scope, nan_aware_sum, nan_last, CostEvaluator, CostEvaluatorResult};
use crate::input::EvaluationInput;
use crate::parameters::LoopFlowParameters;
use rao_core::{FlowCnec, FlowResult, Unit};
use std::collections::HashSet;
use std::sync::Arc;

/// Virtual cost of loop flows above their threshold, in MW.
///
/// On each side the threshold is the larger of the CNEC's own loop-flow
/// threshold and the initial loop flow plus the acceptable increase, so
/// that loop flows already above their limit before optimization are only
/// penalized if they grow. The excess of a CNEC is its worst side's.
pub struct LoopFlowViolationCostEvaluator {
    cnecs: Vec<Arc<FlowCnec>>,
    initial_flows: Arc<dyn FlowResult>,
    acceptable_increase: f64,
    violation_cost: f64,
}

impl LoopFlowViolationCostEvaluator {
    pub const NAME: &'static str = "loop-flow-cost";

    /// Only the CNECs of `cnecs` carrying a loop-flow threshold are kept.
    pub fn new(
        cnecs: impl IntoIterator<Item = Arc<FlowCnec>>,
        initial_flows: Arc<dyn FlowResult>,
        parameters: &LoopFlowParameters,
    ) -> Self {
        Self {
            cnecs: cnecs
                .into_iter()
                .filter(|c| c.loop_flow_threshold().is_some())
                .collect(),
            initial_flows,
            acceptable_increase: parameters.acceptable_increase,
            violation_cost: parameters.violation_cost,
        }
    }

    fn excess(&self, input: &EvaluationInput<'_>, cnec: &FlowCnec) -> f64 {
        cnec.monitored_sides()
            .into_iter()
            .map(|side| {
                let own = cnec
                    .loop_flow_threshold_in(side, Unit::Megawatt)
                    .unwrap_or(f64::NAN);
                let initial = self.initial_flows.loop_flow(cnec, side, Unit::Megawatt);
                let current = input.flow.loop_flow(cnec, side, Unit::Megawatt);
                let threshold = own.max(initial.abs() + self.acceptable_increase);
                if [own, initial, current].iter().any(|v| v.is_nan()) {
                    f64::NAN
                } else {
                    (current.abs() - threshold).max(0.0)
                }
            })
            .fold(0.0, |worst: f64, excess| {
                if worst.is_nan() || excess.is_nan() {
                    f64::NAN
                } else {
                    worst.max(excess)
                }
            })
    }
}

impl CostEvaluator for LoopFlowViolationCostEvaluator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn unit(&self) -> Unit {
        Unit::Megawatt
    }

    fn compute_cost_and_limiting_elements(
        &self,
        input: &EvaluationInput<'_>,
        excluded_contingencies: &HashSet<String>,
    ) -> CostEvaluatorResult {
        let mut excesses: Vec<(Arc<FlowCnec>, f64)> = self
            .cnecs
            .iter()
            .filter(|cnec| in_scope(cnec, excluded_contingencies))
            .map(|cnec| (Arc::clone(cnec), self.excess(input, cnec)))
            .collect();

        let cost = self.violation_cost * nan_aware_sum(excesses.iter().map(|(_, e)| *e));

        excesses.retain(|(_, e)| *e > 0.0);
        excesses.sort_by(|(_, a), (_, b)| nan_last(*b, *a));
        CostEvaluatorResult::new(cost, excesses.into_iter().map(|(cnec, _)| cnec).collect())
    }
}

//! Cost evaluators and their composition into an objective function.
//!
//! The search minimizes one *functional* cost (the opposite of the minimum
//! margin) and adds *virtual* costs that price undesirable but legal
//! situations:
//!
//! | Evaluator | Name | Prices |
//! |-----------|------|--------|
//! | [`MinMarginEvaluator`] | `min-margin` | worst optimized CNEC (functional) |
//! | [`MnecViolationCostEvaluator`] | `mnec-cost` | margin lost on monitored CNECs |
//! | [`LoopFlowViolationCostEvaluator`] | `loop-flow-cost` | loop flow above threshold |
//! | [`SensitivityFailureOvercostEvaluator`] | `sensitivity-failure-cost` | failed sensitivity computation |
//! | [`SensitivityFallbackOvercostEvaluator`] | `sensitivity-fallback-cost` | degraded sensitivity computation |
//!
//! Evaluators hold no mutable state: evaluating the same input twice gives
//! bit-identical results, from any thread.

mod function;
mod loop_flow;
mod min_margin;
mod mnec;
mod sensitivity;

pub use function::{ObjectiveFunction, ObjectiveFunctionBuilder, ObjectiveFunctionResult};
pub use loop_flow::LoopFlowViolationCostEvaluator;
pub use min_margin::MinMarginEvaluator;
pub use mnec::MnecViolationCostEvaluator;
pub use sensitivity::{SensitivityFailureOvercostEvaluator, SensitivityFallbackOvercostEvaluator};

use crate::input::EvaluationInput;
use rao_core::{FlowCnec, Unit};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Prices one aspect of a candidate.
pub trait CostEvaluator: Send + Sync {
    /// Unique name within an objective function (e.g. "mnec-cost")
    fn name(&self) -> &str;

    fn unit(&self) -> Unit;

    /// Cost of the candidate and the CNECs responsible for it, most costly
    /// first. CNECs whose state follows a contingency of
    /// `excluded_contingencies` are ignored.
    fn compute_cost_and_limiting_elements(
        &self,
        input: &EvaluationInput<'_>,
        excluded_contingencies: &HashSet<String>,
    ) -> CostEvaluatorResult;
}

/// A cost and the CNECs responsible for it, most costly first.
#[derive(Debug, Clone)]
pub struct CostEvaluatorResult {
    cost: f64,
    costly_elements: Vec<Arc<FlowCnec>>,
}

impl CostEvaluatorResult {
    pub fn new(cost: f64, costly_elements: Vec<Arc<FlowCnec>>) -> Self {
        Self {
            cost,
            costly_elements,
        }
    }

    /// A cost no CNEC is individually responsible for.
    pub fn without_elements(cost: f64) -> Self {
        Self::new(cost, Vec::new())
    }

    /// Result for an unknown evaluator: `NaN`, no element.
    pub fn undefined() -> Self {
        Self::without_elements(f64::NAN)
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn costly_elements(&self) -> &[Arc<FlowCnec>] {
        &self.costly_elements
    }

    /// The `n` most costly elements (fewer if there are not that many).
    pub fn top_elements(&self, n: usize) -> &[Arc<FlowCnec>] {
        &self.costly_elements[..n.min(self.costly_elements.len())]
    }
}

/// CNEC in scope of an evaluation: not following an excluded contingency.
pub(crate) fn in_scope(cnec: &FlowCnec, excluded_contingencies: &HashSet<String>) -> bool {
    cnec.state()
        .contingency_id()
        .map_or(true, |co| !excluded_contingencies.contains(co))
}

/// Total order on values with `NaN` after every number.
pub(crate) fn nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Sum that stays `NaN` once any term is.
pub(crate) fn nan_aware_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_last_ordering() {
        let mut values = vec![3.0, f64::NAN, -1.0, 2.0];
        values.sort_by(|a, b| nan_last(*a, *b));
        assert_eq!(values[..3], [-1.0, 2.0, 3.0]);
        assert!(values[3].is_nan());
    }

    #[test]
    fn test_top_elements_truncates() {
        let result = CostEvaluatorResult::without_elements(4.0);
        assert!(result.top_elements(3).is_empty());
        assert!(CostEvaluatorResult::undefined().cost().is_nan());
    }

    #[test]
    fn test_nan_aware_sum() {
        assert_eq!(nan_aware_sum([1.0, 2.0]), 3.0);
        assert!(nan_aware_sum([1.0, f64::NAN]).is_nan());
        assert_eq!(nan_aware_sum([]), 0.0);
    }

    #[test]
    fn test_cost_evaluator_is_object_safe() {
        fn _accepts(_e: &dyn CostEvaluator) {}
        fn _assert_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_send_sync::<dyn CostEvaluator>();
    }
}

use super::{in_scope, CostEvaluator, CostEvaluatorResult};
use crate::input::EvaluationInput;
use rao_core::{ComputationStatus, FlowCnec, State, Unit};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// Fixed overcost when the sensitivity computation failed, globally or for
/// any state monitored by the CNECs in scope.
///
/// Failure is priced per candidate, never per CNEC: the costly-element list
/// is always empty.
pub struct SensitivityFailureOvercostEvaluator {
    cnecs: Vec<Arc<FlowCnec>>,
    overcost: f64,
}

impl SensitivityFailureOvercostEvaluator {
    pub const NAME: &'static str = "sensitivity-failure-cost";

    pub fn new(cnecs: Vec<Arc<FlowCnec>>, overcost: f64) -> Self {
        Self { cnecs, overcost }
    }

    /// Distinct states of the in-scope CNECs, in catalog order.
    fn states_in_scope<'a>(&'a self, excluded_contingencies: &HashSet<String>) -> Vec<&'a State> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.cnecs
            .iter()
            .filter(|cnec| in_scope(cnec, excluded_contingencies))
            .map(|cnec| cnec.state())
            .filter(|state| seen.insert(state.id()))
            .collect()
    }
}

impl CostEvaluator for SensitivityFailureOvercostEvaluator {
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
        if input.global_status() == ComputationStatus::Failure {
            warn!(
                overcost = self.overcost,
                "sensitivity computation failed, applying overcost"
            );
            return CostEvaluatorResult::without_elements(self.overcost);
        }
        let failed = self
            .states_in_scope(excluded_contingencies)
            .into_iter()
            .find(|state| {
                input.sensitivity.sensitivity_status_for(state) == ComputationStatus::Failure
            });
        match failed {
            Some(state) => {
                warn!(
                    state = state.id(),
                    overcost = self.overcost,
                    "sensitivity computation failed for state, applying overcost"
                );
                CostEvaluatorResult::without_elements(self.overcost)
            }
            None => CostEvaluatorResult::without_elements(0.0),
        }
    }
}

/// Fixed overcost when the sensitivity computation went through its
/// degraded path. A failure is not a fallback: it costs nothing here.
pub struct SensitivityFallbackOvercostEvaluator {
    overcost: f64,
}

impl SensitivityFallbackOvercostEvaluator {
    pub const NAME: &'static str = "sensitivity-fallback-cost";

    pub fn new(overcost: f64) -> Self {
        Self { overcost }
    }
}

impl CostEvaluator for SensitivityFallbackOvercostEvaluator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn unit(&self) -> Unit {
        Unit::Megawatt
    }

    fn compute_cost_and_limiting_elements(
        &self,
        input: &EvaluationInput<'_>,
        _excluded_contingencies: &HashSet<String>,
    ) -> CostEvaluatorResult {
        match input.global_status() {
            ComputationStatus::Fallback => {
                warn!(
                    overcost = self.overcost,
                    "sensitivity computation used its fallback, applying overcost"
                );
                CostEvaluatorResult::without_elements(self.overcost)
            }
            ComputationStatus::Default | ComputationStatus::Failure => {
                CostEvaluatorResult::without_elements(0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rao_core::test_fixtures::sample_crac;
    use rao_core::{ActivationSnapshot, Crac, FlowSnapshot, SensitivitySnapshot};

    fn cost_with(
        evaluator: &dyn CostEvaluator,
        sensi: &SensitivitySnapshot,
        status: Option<ComputationStatus>,
        excluded: &HashSet<String>,
    ) -> CostEvaluatorResult {
        let flows = FlowSnapshot::new();
        let activation = ActivationSnapshot::new();
        let mut input = EvaluationInput::new(&flows, &activation, sensi);
        input.status = status;
        evaluator.compute_cost_and_limiting_elements(&input, excluded)
    }

    fn failure_evaluator(crac: &Crac) -> SensitivityFailureOvercostEvaluator {
        SensitivityFailureOvercostEvaluator::new(crac.flow_cnecs().to_vec(), 10_000.0)
    }

    #[test]
    fn test_fallback_overcost_by_status() {
        let evaluator = SensitivityFallbackOvercostEvaluator::new(10.0);
        let none = HashSet::new();
        for (status, expected) in [
            (ComputationStatus::Default, 0.0),
            (ComputationStatus::Fallback, 10.0),
            (ComputationStatus::Failure, 0.0),
        ] {
            let sensi = SensitivitySnapshot::new(status);
            let result = cost_with(&evaluator, &sensi, None, &none);
            assert_eq!(result.cost(), expected, "status {status:?}");
            assert!(result.costly_elements().is_empty());
        }
    }

    #[test]
    fn test_failure_overcost_on_global_status() {
        let crac = sample_crac().unwrap();
        let evaluator = failure_evaluator(&crac);
        let none = HashSet::new();

        let ok = SensitivitySnapshot::new(ComputationStatus::Default);
        assert_eq!(cost_with(&evaluator, &ok, None, &none).cost(), 0.0);
        assert_eq!(
            cost_with(&evaluator, &ok, Some(ComputationStatus::Failure), &none).cost(),
            10_000.0
        );

        let failed = SensitivitySnapshot::new(ComputationStatus::Failure);
        let result = cost_with(&evaluator, &failed, None, &none);
        assert_eq!(result.cost(), 10_000.0);
        assert!(result.costly_elements().is_empty());
    }

    #[test]
    fn test_failure_overcost_on_state_status() {
        let crac = sample_crac().unwrap();
        let evaluator = failure_evaluator(&crac);
        let co2 = crac.state(Some("co2"), "curative").unwrap();
        let sensi = SensitivitySnapshot::new(ComputationStatus::Default)
            .with_state_status(co2.id(), ComputationStatus::Failure);

        assert_eq!(
            cost_with(&evaluator, &sensi, None, &HashSet::new()).cost(),
            10_000.0
        );
        // the failed state is out of scope once its contingency is excluded
        let excluded = HashSet::from(["co2".to_string()]);
        assert_eq!(cost_with(&evaluator, &sensi, None, &excluded).cost(), 0.0);
    }

    #[test]
    fn test_fallback_state_is_not_failure() {
        let crac = sample_crac().unwrap();
        let evaluator = failure_evaluator(&crac);
        let sensi = SensitivitySnapshot::new(ComputationStatus::Fallback)
            .with_state_status("co1 - curative", ComputationStatus::Fallback);
        assert_eq!(
            cost_with(&evaluator, &sensi, None, &HashSet::new()).cost(),
            0.0
        );
    }
}

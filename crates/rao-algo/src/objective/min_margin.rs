use super::{in_scope, nan_last, CostEvaluator, CostEvaluatorResult};
use crate::input::EvaluationInput;
use crate::margin::MarginEvaluator;
use rao_core::{ComputationStatus, FlowCnec, Unit};
use std::collections::HashSet;
use std::sync::Arc;

/// Margins from here on come from a CNEC declared not limiting.
const NOT_LIMITING: f64 = f64::MAX / 2.0;

/// Functional cost: the opposite of the smallest margin among optimized
/// CNECs, so that an overload gives a positive cost.
///
/// CNECs of states whose sensitivity computation failed are skipped; the
/// failure is priced by [`super::SensitivityFailureOvercostEvaluator`].
///
/// Without any optimized CNEC the cost is `-f64::MAX` ("unconstrained").
/// When optimized CNECs exist but none is in scope, or every one of them is
/// declared not limiting by the margin evaluator, the cost falls back to the
/// opposite of the largest threshold among all CNECs, which stays finite so
/// that virtual costs keep weighing on the total.
pub struct MinMarginEvaluator {
    cnecs: Vec<Arc<FlowCnec>>,
    unit: Unit,
    margin_evaluator: Arc<dyn MarginEvaluator>,
}

impl MinMarginEvaluator {
    pub const NAME: &'static str = "min-margin";

    pub fn new(
        cnecs: Vec<Arc<FlowCnec>>,
        unit: Unit,
        margin_evaluator: Arc<dyn MarginEvaluator>,
    ) -> Self {
        Self {
            cnecs,
            unit,
            margin_evaluator,
        }
    }

    fn worst_case_cost(&self) -> f64 {
        -self
            .cnecs
            .iter()
            .map(|cnec| cnec.largest_threshold(self.unit))
            .fold(0.0, f64::max)
    }
}

impl CostEvaluator for MinMarginEvaluator {
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
        if !self.cnecs.iter().any(|cnec| cnec.is_optimized()) {
            return CostEvaluatorResult::without_elements(-f64::MAX);
        }

        let mut margins: Vec<(Arc<FlowCnec>, f64)> = self
            .cnecs
            .iter()
            .filter(|cnec| cnec.is_optimized() && in_scope(cnec, excluded_contingencies))
            .filter(|cnec| {
                input.sensitivity.sensitivity_status_for(cnec.state())
                    != ComputationStatus::Failure
            })
            .map(|cnec| {
                let margin = self.margin_evaluator.margin(input, cnec, self.unit);
                (Arc::clone(cnec), margin)
            })
            .collect();

        if margins.is_empty() {
            return CostEvaluatorResult::without_elements(self.worst_case_cost());
        }

        // Stable: ties keep catalog order
        margins.sort_by(|(_, a), (_, b)| nan_last(*a, *b));
        let cost = if margins.iter().any(|(_, m)| m.is_nan()) {
            f64::NAN
        } else if margins[0].1 >= NOT_LIMITING {
            self.worst_case_cost()
        } else {
            -margins[0].1
        };
        CostEvaluatorResult::new(cost, margins.into_iter().map(|(cnec, _)| cnec).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::margin::BasicMarginEvaluator;
    use rao_core::test_fixtures::{symmetric_cnec, timeline_crac, CURATIVE};
    use rao_core::{
        ActivationSnapshot, Contingency, Crac, FlowSnapshot, SensitivitySnapshot, State,
    };

    struct Fixture {
        crac: Crac,
        co1: State,
    }

    fn fixture() -> Fixture {
        let mut crac = timeline_crac().unwrap();
        crac.add_contingency(Contingency::single_branch("co1", "line-1"))
            .unwrap();
        let co1 = crac.add_state("co1", CURATIVE).unwrap();
        let preventive = crac.preventive_state().unwrap().clone();
        for cnec in [
            symmetric_cnec("cnec1", &preventive, 1000.0, true, false).unwrap(),
            symmetric_cnec("cnec2", &co1, 1000.0, true, false).unwrap(),
            symmetric_cnec("cnec3", &preventive, 1500.0, true, true).unwrap(),
            symmetric_cnec("pure-mnec", &preventive, 2000.0, false, true).unwrap(),
        ] {
            crac.add_flow_cnec(cnec).unwrap();
        }
        Fixture { crac, co1 }
    }

    fn margins() -> FlowSnapshot {
        FlowSnapshot::new()
            .with_margin("cnec1", Unit::Megawatt, -150.0)
            .with_margin("cnec2", Unit::Megawatt, 200.0)
            .with_margin("cnec3", Unit::Megawatt, -250.0)
            .with_margin("pure-mnec", Unit::Megawatt, 50.0)
    }

    fn evaluator(crac: &Crac) -> MinMarginEvaluator {
        MinMarginEvaluator::new(
            crac.flow_cnecs().to_vec(),
            Unit::Megawatt,
            Arc::new(BasicMarginEvaluator),
        )
    }

    fn ids(result: &CostEvaluatorResult) -> Vec<&str> {
        result.costly_elements().iter().map(|c| c.id()).collect()
    }

    #[test]
    fn test_cost_is_opposite_of_min_margin() {
        let f = fixture();
        let flows = margins();
        let activation = ActivationSnapshot::new();
        let sensi = SensitivitySnapshot::new(ComputationStatus::Default);
        let input = EvaluationInput::new(&flows, &activation, &sensi);

        let result = evaluator(&f.crac).compute_cost_and_limiting_elements(&input, &HashSet::new());
        assert_eq!(result.cost(), 250.0);
        assert_eq!(ids(&result), vec!["cnec3", "cnec1", "cnec2"]);
        assert_eq!(result.top_elements(1)[0].id(), "cnec3");
    }

    #[test]
    fn test_failed_states_are_skipped() {
        let f = fixture();
        let flows = margins();
        let activation = ActivationSnapshot::new();
        let sensi = SensitivitySnapshot::new(ComputationStatus::Default)
            .with_state_status(f.co1.id(), ComputationStatus::Failure);
        let input = EvaluationInput::new(&flows, &activation, &sensi);

        let result = evaluator(&f.crac).compute_cost_and_limiting_elements(&input, &HashSet::new());
        assert_eq!(ids(&result), vec!["cnec3", "cnec1"]);
    }

    #[test]
    fn test_excluded_contingencies() {
        let f = fixture();
        let flows = FlowSnapshot::new().with_margin("cnec2", Unit::Megawatt, -400.0);
        let activation = ActivationSnapshot::new();
        let sensi = SensitivitySnapshot::new(ComputationStatus::Default);
        let input = EvaluationInput::new(&flows, &activation, &sensi);

        // only co1's CNEC is optimized and in scope here
        let evaluator = MinMarginEvaluator::new(
            vec![
                f.crac.flow_cnecs()[1].clone(),
                f.crac.flow_cnecs()[3].clone(),
            ],
            Unit::Megawatt,
            Arc::new(BasicMarginEvaluator),
        );
        let all = evaluator.compute_cost_and_limiting_elements(&input, &HashSet::new());
        assert_eq!(all.cost(), 400.0);

        let excluded = HashSet::from(["co1".to_string()]);
        let result = evaluator.compute_cost_and_limiting_elements(&input, &excluded);
        // falls back to the largest threshold, pure-mnec's 2000 MW
        assert_eq!(result.cost(), -2000.0);
        assert!(result.costly_elements().is_empty());
    }

    #[test]
    fn test_no_optimized_cnec_is_unconstrained() {
        let f = fixture();
        let flows = margins();
        let activation = ActivationSnapshot::new();
        let sensi = SensitivitySnapshot::new(ComputationStatus::Default);
        let input = EvaluationInput::new(&flows, &activation, &sensi);

        let evaluator = MinMarginEvaluator::new(
            vec![f.crac.flow_cnecs()[3].clone()],
            Unit::Megawatt,
            Arc::new(BasicMarginEvaluator),
        );
        let result = evaluator.compute_cost_and_limiting_elements(&input, &HashSet::new());
        assert_eq!(result.cost(), -f64::MAX);
        assert!(result.costly_elements().is_empty());
    }

    #[test]
    fn test_all_cnecs_not_limiting_gives_finite_cost() {
        let f = fixture();
        let flows = FlowSnapshot::new()
            .with_margin("cnec1", Unit::Megawatt, f64::MAX)
            .with_margin("cnec2", Unit::Megawatt, f64::MAX)
            .with_margin("cnec3", Unit::Megawatt, f64::MAX);
        let activation = ActivationSnapshot::new();
        let sensi = SensitivitySnapshot::new(ComputationStatus::Default);
        let input = EvaluationInput::new(&flows, &activation, &sensi);

        let result = evaluator(&f.crac).compute_cost_and_limiting_elements(&input, &HashSet::new());
        // largest threshold is pure-mnec's 2000 MW
        assert_eq!(result.cost(), -2000.0);
        assert!((result.cost() + 1500.0).is_finite());
    }

    #[test]
    fn test_undefined_margin_propagates() {
        let f = fixture();
        let flows = margins().with_margin("cnec2", Unit::Megawatt, f64::NAN);
        let activation = ActivationSnapshot::new();
        let sensi = SensitivitySnapshot::new(ComputationStatus::Default);
        let input = EvaluationInput::new(&flows, &activation, &sensi);

        let result = evaluator(&f.crac).compute_cost_and_limiting_elements(&input, &HashSet::new());
        assert!(result.cost().is_nan());
        assert_eq!(ids(&result), vec!["cnec3", "cnec1", "cnec2"]);
    }
}

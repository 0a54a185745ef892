use super::{
    nan_aware_sum, CostEvaluator, CostEvaluatorResult, LoopFlowViolationCostEvaluator,
    MinMarginEvaluator, MnecViolationCostEvaluator, SensitivityFailureOvercostEvaluator,
    SensitivityFallbackOvercostEvaluator,
};
use crate::input::EvaluationInput;
use crate::margin::{
    BasicMarginEvaluator, BasicRelativeMarginEvaluator, MarginEvaluator,
    MarginEvaluatorWithPstLimitationUnoptimizedCnecs,
};
use crate::parameters::{ObjectiveFunctionType, RaoParameters};
use rao_core::{
    CoreResult, Crac, FlowCnec, FlowResult, RangeAction, RangeActionActivationResult, RaoError,
    RemedialAction, Unit,
};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// One functional cost evaluator and any number of named virtual ones.
///
/// ```
/// use rao_algo::objective::{ObjectiveFunction, SensitivityFallbackOvercostEvaluator};
/// use rao_algo::margin::BasicMarginEvaluator;
/// use rao_algo::objective::MinMarginEvaluator;
/// use rao_core::Unit;
/// use std::sync::Arc;
///
/// # fn main() -> rao_core::CoreResult<()> {
/// let objective = ObjectiveFunction::builder()
///     .with_virtual_cost_evaluator(Arc::new(SensitivityFallbackOvercostEvaluator::new(10.0)))?
///     .build(Arc::new(MinMarginEvaluator::new(
///         Vec::new(),
///         Unit::Megawatt,
///         Arc::new(BasicMarginEvaluator),
///     )));
/// assert!(objective.virtual_cost_names().contains("sensitivity-fallback-cost"));
/// # Ok(())
/// # }
/// ```
pub struct ObjectiveFunction {
    functional: Arc<dyn CostEvaluator>,
    virtual_evaluators: Vec<Arc<dyn CostEvaluator>>,
}

/// Collects virtual cost evaluators; the functional one is required by
/// [`ObjectiveFunctionBuilder::build`].
#[derive(Default)]
pub struct ObjectiveFunctionBuilder {
    virtual_evaluators: Vec<Arc<dyn CostEvaluator>>,
}

impl ObjectiveFunctionBuilder {
    /// Register a virtual cost evaluator; names must be unique.
    pub fn with_virtual_cost_evaluator(
        mut self,
        evaluator: Arc<dyn CostEvaluator>,
    ) -> CoreResult<Self> {
        if self
            .virtual_evaluators
            .iter()
            .any(|e| e.name() == evaluator.name())
        {
            return Err(RaoError::Config(format!(
                "virtual cost evaluator '{}' is already registered",
                evaluator.name()
            )));
        }
        self.virtual_evaluators.push(evaluator);
        Ok(self)
    }

    pub fn build(self, functional: Arc<dyn CostEvaluator>) -> ObjectiveFunction {
        ObjectiveFunction {
            functional,
            virtual_evaluators: self.virtual_evaluators,
        }
    }
}

impl ObjectiveFunction {
    pub fn builder() -> ObjectiveFunctionBuilder {
        ObjectiveFunctionBuilder::default()
    }

    /// Objective function configured by `parameters` over every CNEC of
    /// `crac`. `initial_flows` is the reference for MNEC and loop-flow
    /// degradation; `reference_setpoints` anchors the admissible ranges of
    /// PSTs in series with unoptimized CNECs.
    pub fn from_parameters(
        crac: &Crac,
        parameters: &RaoParameters,
        initial_flows: Arc<dyn FlowResult>,
        reference_setpoints: Arc<dyn RangeActionActivationResult>,
    ) -> CoreResult<Self> {
        parameters.validate(crac)?;
        let unit = Unit::from(parameters.objective_function.unit);
        let cnecs: Vec<Arc<FlowCnec>> = crac.flow_cnecs().to_vec();

        let mut margin_evaluator: Arc<dyn MarginEvaluator> =
            match parameters.objective_function.kind {
                ObjectiveFunctionType::MaxMinMargin => Arc::new(BasicMarginEvaluator),
                ObjectiveFunctionType::MaxMinRelativeMargin => {
                    Arc::new(BasicRelativeMarginEvaluator)
                }
            };
        if !parameters.unoptimized_cnecs_in_series_with_psts.is_empty() {
            let cnecs_in_series = parameters
                .unoptimized_cnecs_in_series_with_psts
                .iter()
                .map(|(cnec_id, pst_id)| {
                    let pst = crac
                        .range_actions()
                        .iter()
                        .find(|ra| ra.id() == pst_id)
                        .cloned()
                        .ok_or_else(|| {
                            RaoError::Config(format!("PST '{pst_id}' is not in the CRAC"))
                        })?;
                    Ok((cnec_id.clone(), pst))
                })
                .collect::<CoreResult<HashMap<String, Arc<RangeAction>>>>()?;
            margin_evaluator = Arc::new(MarginEvaluatorWithPstLimitationUnoptimizedCnecs::new(
                margin_evaluator,
                cnecs_in_series,
                reference_setpoints,
            ));
        }

        let functional = Arc::new(MinMarginEvaluator::new(
            cnecs.clone(),
            unit,
            margin_evaluator,
        ));

        let mut builder = ObjectiveFunction::builder();
        if cnecs.iter().any(|c| c.is_monitored()) {
            builder = builder.with_virtual_cost_evaluator(Arc::new(
                MnecViolationCostEvaluator::new(
                    cnecs.clone(),
                    Arc::clone(&initial_flows),
                    unit,
                    &parameters.mnec,
                ),
            ))?;
        }
        if parameters.loop_flow.violation_cost > 0.0
            && cnecs.iter().any(|c| c.loop_flow_threshold().is_some())
        {
            builder = builder.with_virtual_cost_evaluator(Arc::new(
                LoopFlowViolationCostEvaluator::new(
                    cnecs.clone(),
                    Arc::clone(&initial_flows),
                    &parameters.loop_flow,
                ),
            ))?;
        }
        builder = builder.with_virtual_cost_evaluator(Arc::new(
            SensitivityFailureOvercostEvaluator::new(
                cnecs,
                parameters.sensitivity.failure_overcost,
            ),
        ))?;
        if parameters.sensitivity.fallback_overcost > 0.0 {
            builder = builder.with_virtual_cost_evaluator(Arc::new(
                SensitivityFallbackOvercostEvaluator::new(
                    parameters.sensitivity.fallback_overcost,
                ),
            ))?;
        }

        let objective = builder.build(functional);
        info!(
            crac = crac.id(),
            functional = objective.functional.name(),
            virtual_costs = ?objective.virtual_cost_names(),
            "objective function configured"
        );
        Ok(objective)
    }

    pub fn functional_cost_and_limiting_elements(
        &self,
        input: &EvaluationInput<'_>,
    ) -> CostEvaluatorResult {
        self.functional
            .compute_cost_and_limiting_elements(input, &HashSet::new())
    }

    pub fn virtual_cost_names(&self) -> HashSet<String> {
        self.virtual_evaluators
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// `NaN` and no element for an unregistered name.
    pub fn virtual_cost_and_costly_elements(
        &self,
        input: &EvaluationInput<'_>,
        name: &str,
    ) -> CostEvaluatorResult {
        self.virtual_evaluators
            .iter()
            .find(|e| e.name() == name)
            .map_or_else(CostEvaluatorResult::undefined, |e| {
                e.compute_cost_and_limiting_elements(input, &HashSet::new())
            })
    }

    pub fn evaluate(&self, input: &EvaluationInput<'_>) -> ObjectiveFunctionResult {
        self.evaluate_excluding(input, &HashSet::new())
    }

    /// Evaluate, ignoring CNECs that follow an excluded contingency.
    pub fn evaluate_excluding(
        &self,
        input: &EvaluationInput<'_>,
        excluded_contingencies: &HashSet<String>,
    ) -> ObjectiveFunctionResult {
        let functional = self
            .functional
            .compute_cost_and_limiting_elements(input, excluded_contingencies);
        let virtual_costs: Vec<(String, CostEvaluatorResult)> = self
            .virtual_evaluators
            .iter()
            .map(|e| {
                (
                    e.name().to_string(),
                    e.compute_cost_and_limiting_elements(input, excluded_contingencies),
                )
            })
            .collect();
        let result = ObjectiveFunctionResult {
            functional,
            virtual_costs,
        };
        debug!(
            cost = result.cost(),
            functional_cost = result.functional_cost(),
            virtual_cost = result.virtual_cost(),
            limiting_element = result.most_limiting_elements(1).first().map(|c| c.id()),
            "evaluated candidate"
        );
        result
    }

    /// Evaluate independent candidates in parallel; results keep input order.
    pub fn evaluate_all(&self, inputs: &[EvaluationInput<'_>]) -> Vec<ObjectiveFunctionResult> {
        inputs.par_iter().map(|input| self.evaluate(input)).collect()
    }
}

/// Costs of one candidate, broken down by evaluator.
#[derive(Debug, Clone)]
pub struct ObjectiveFunctionResult {
    functional: CostEvaluatorResult,
    virtual_costs: Vec<(String, CostEvaluatorResult)>,
}

impl ObjectiveFunctionResult {
    pub fn functional_cost(&self) -> f64 {
        self.functional.cost()
    }

    /// Sum of all virtual costs, `0` without virtual evaluator.
    pub fn virtual_cost(&self) -> f64 {
        nan_aware_sum(self.virtual_costs.iter().map(|(_, r)| r.cost()))
    }

    /// `NaN` for an unregistered name.
    pub fn virtual_cost_of(&self, name: &str) -> f64 {
        self.virtual_result(name)
            .map_or(f64::NAN, CostEvaluatorResult::cost)
    }

    pub fn cost(&self) -> f64 {
        self.functional_cost() + self.virtual_cost()
    }

    /// The functional evaluator's ranking, truncated to `n`.
    pub fn most_limiting_elements(&self, n: usize) -> &[Arc<FlowCnec>] {
        self.functional.top_elements(n)
    }

    /// Names in registration order.
    pub fn virtual_cost_names(&self) -> Vec<&str> {
        self.virtual_costs
            .iter()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Empty for an unregistered name.
    pub fn costly_elements(&self, name: &str, n: usize) -> &[Arc<FlowCnec>] {
        self.virtual_result(name)
            .map(|r| r.top_elements(n))
            .unwrap_or_default()
    }

    fn virtual_result(&self, name: &str) -> Option<&CostEvaluatorResult> {
        self.virtual_costs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }
}

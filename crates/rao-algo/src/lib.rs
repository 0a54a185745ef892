//! # rao-algo: Objective Function for Remedial Action Optimization
//!
//! Scores candidate combinations of remedial actions explored by an RAO
//! search. A candidate is described by its flow, range-action activation
//! and sensitivity results (see [`EvaluationInput`]); the objective function
//! reduces them to a single cost to minimize.
//!
//! ## Architecture
//!
//! The objective function is assembled from two kinds of strategy objects:
//!
//! - **[`margin::MarginEvaluator`]**: how the margin of one CNEC is read
//!   (absolute, relative, or ignoring CNECs a dedicated PST can still secure)
//! - **[`objective::CostEvaluator`]**: one component of the cost, functional
//!   (minimum margin) or virtual (MNEC, loop-flow, sensitivity penalties)
//!
//! [`ObjectiveFunction`] combines exactly one functional evaluator with any
//! number of uniquely named virtual ones:
//!
//! | Quantity | Value |
//! |----------|-------|
//! | functional cost | `-min(margin)` over optimized CNECs |
//! | virtual cost | sum of the virtual evaluators' costs |
//! | cost | functional + virtual |
//!
//! Every evaluator is `Send + Sync` and stateless after construction, so
//! [`ObjectiveFunction::evaluate_all`] scores independent candidates on the
//! rayon thread pool.
//!
//! ## Configuration
//!
//! [`RaoParameters`] is read from YAML or JSON and drives
//! [`ObjectiveFunction::from_parameters`].
//!
//! ## Example
//!
//! ```
//! use rao_algo::{EvaluationInput, ObjectiveFunction, RaoParameters};
//! use rao_core::test_fixtures::sample_crac;
//! use rao_core::{ActivationSnapshot, ComputationStatus, FlowSnapshot, SensitivitySnapshot, Unit};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let crac = sample_crac()?;
//! let objective = ObjectiveFunction::from_parameters(
//!     &crac,
//!     &RaoParameters::default(),
//!     Arc::new(FlowSnapshot::new()),
//!     Arc::new(ActivationSnapshot::new()),
//! )?;
//!
//! let flows = FlowSnapshot::new()
//!     .with_margin("cnec-prev", Unit::Megawatt, -120.0)
//!     .with_margin("cnec-co1-outage", Unit::Megawatt, 80.0)
//!     .with_margin("cnec-co1-curative", Unit::Megawatt, 40.0)
//!     .with_margin("cnec-co2-curative", Unit::Megawatt, 10.0);
//! let activation = ActivationSnapshot::new();
//! let sensi = SensitivitySnapshot::new(ComputationStatus::Default);
//! let input = EvaluationInput::new(&flows, &activation, &sensi);
//!
//! let result = objective.functional_cost_and_limiting_elements(&input);
//! assert_eq!(result.cost(), 120.0);
//! assert_eq!(result.costly_elements()[0].id(), "cnec-prev");
//! # Ok(())
//! # }
//! ```

pub mod input;
pub mod margin;
pub mod objective;
pub mod parameters;
pub mod rao_result;

pub use input::EvaluationInput;
pub use margin::{
    BasicMarginEvaluator, BasicRelativeMarginEvaluator, MarginEvaluator,
    MarginEvaluatorWithPstLimitationUnoptimizedCnecs,
};
pub use objective::{
    CostEvaluator, CostEvaluatorResult, ObjectiveFunction, ObjectiveFunctionBuilder,
    ObjectiveFunctionResult,
};
pub use parameters::{
    LoopFlowParameters, MarginUnit, MnecParameters, ObjectiveFunctionParameters,
    ObjectiveFunctionType, RaUsageLimitsConfig, RaoParameters, SensitivityParameters,
};
pub use rao_result::{Checkpoint, CostResult, RaoResult};

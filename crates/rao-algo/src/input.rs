//! Read-only snapshots handed to every evaluator for one candidate.

use rao_core::{ComputationStatus, FlowResult, RangeActionActivationResult, SensitivityResult};

/// Flow, activation and sensitivity results of one combination of remedial
/// actions, plus an optional override of the global sensitivity status.
///
/// Evaluators only read through it, so one input may be shared by any
/// number of threads.
#[derive(Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub flow: &'a dyn FlowResult,
    pub activation: &'a dyn RangeActionActivationResult,
    pub sensitivity: &'a dyn SensitivityResult,
    pub status: Option<ComputationStatus>,
}

impl<'a> EvaluationInput<'a> {
    pub fn new(
        flow: &'a dyn FlowResult,
        activation: &'a dyn RangeActionActivationResult,
        sensitivity: &'a dyn SensitivityResult,
    ) -> Self {
        Self {
            flow,
            activation,
            sensitivity,
            status: None,
        }
    }

    pub fn with_status(mut self, status: ComputationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Explicit status if given, the sensitivity result's own otherwise.
    pub fn global_status(&self) -> ComputationStatus {
        self.status
            .unwrap_or_else(|| self.sensitivity.sensitivity_status())
    }
}

impl std::fmt::Debug for EvaluationInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationInput")
            .field("status", &self.global_status())
            .finish_non_exhaustive()
    }
}

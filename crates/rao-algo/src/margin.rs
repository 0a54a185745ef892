//! Margin evaluators: the signed distance of a CNEC to its limits, as seen
//! by the cost evaluators.
//!
//! All implementations are stateless; `NaN` comes out exactly when the
//! underlying flow or margin is undefined.

use crate::input::EvaluationInput;
use rao_core::result::MIN_PTDF_ZONAL_SUM;
use rao_core::{
    nan_aware_min, FlowCnec, RangeAction, RangeActionActivationResult, RemedialAction, Side, Unit,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Computes the margin of a CNEC for one candidate.
pub trait MarginEvaluator: Send + Sync {
    fn margin_on_side(
        &self,
        input: &EvaluationInput<'_>,
        cnec: &FlowCnec,
        side: Side,
        unit: Unit,
    ) -> f64;

    /// Worst margin over the CNEC's monitored sides.
    fn margin(&self, input: &EvaluationInput<'_>, cnec: &FlowCnec, unit: Unit) -> f64 {
        cnec.monitored_sides()
            .into_iter()
            .map(|side| self.margin_on_side(input, cnec, side, unit))
            .fold(f64::INFINITY, nan_aware_min)
    }
}

/// The flow result's margin, verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMarginEvaluator;

impl MarginEvaluator for BasicMarginEvaluator {
    fn margin_on_side(
        &self,
        input: &EvaluationInput<'_>,
        cnec: &FlowCnec,
        side: Side,
        unit: Unit,
    ) -> f64 {
        input.flow.margin_on_side(cnec, side, unit)
    }

    fn margin(&self, input: &EvaluationInput<'_>, cnec: &FlowCnec, unit: Unit) -> f64 {
        input.flow.margin(cnec, unit)
    }
}

/// The flow result's relative margin, verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRelativeMarginEvaluator;

impl MarginEvaluator for BasicRelativeMarginEvaluator {
    fn margin_on_side(
        &self,
        input: &EvaluationInput<'_>,
        cnec: &FlowCnec,
        side: Side,
        unit: Unit,
    ) -> f64 {
        let margin = input.flow.margin_on_side(cnec, side, unit);
        if margin > 0.0 {
            margin / input.flow.ptdf_zonal_sum(cnec, side).max(MIN_PTDF_ZONAL_SUM)
        } else {
            margin
        }
    }

    fn margin(&self, input: &EvaluationInput<'_>, cnec: &FlowCnec, unit: Unit) -> f64 {
        input.flow.relative_margin(cnec, unit)
    }
}

/// Ignores CNECs that the PST in series with them can still secure.
///
/// Such a CNEC is left out of the optimization (the PST will be moved
/// afterwards to secure it), so it should not limit the search as long as
/// the PST's remaining range covers the overload in both directions.
///
/// The admissible range of the PST is anchored on `reference_setpoints`,
/// the setpoints before the candidate's own moves; the candidate's
/// setpoint only decides how much of that range is left.
pub struct MarginEvaluatorWithPstLimitationUnoptimizedCnecs {
    base: Arc<dyn MarginEvaluator>,
    /// CNEC id -> PST in series
    cnecs_in_series: HashMap<String, Arc<RangeAction>>,
    reference_setpoints: Arc<dyn RangeActionActivationResult>,
}

impl MarginEvaluatorWithPstLimitationUnoptimizedCnecs {
    pub fn new(
        base: Arc<dyn MarginEvaluator>,
        cnecs_in_series: HashMap<String, Arc<RangeAction>>,
        reference_setpoints: Arc<dyn RangeActionActivationResult>,
    ) -> Self {
        Self {
            base,
            cnecs_in_series,
            reference_setpoints,
        }
    }

    fn pst_can_secure(
        &self,
        input: &EvaluationInput<'_>,
        cnec: &FlowCnec,
        side: Side,
        unit: Unit,
        pst: &RangeAction,
    ) -> bool {
        let flow = input.flow.flow(cnec, side, unit);
        let sensitivity = input.sensitivity.sensitivity_value(cnec, side, pst, unit);
        let setpoint = input.activation.optimized_setpoint(pst, cnec.state());
        let reference = self.reference_setpoints.optimized_setpoint(pst, cnec.state());
        let (min_setpoint, max_setpoint) = pst.admissible_range(reference);
        if [flow, sensitivity, setpoint, min_setpoint, max_setpoint]
            .iter()
            .any(|v| v.is_nan())
        {
            return false;
        }

        let above = cnec
            .upper_bound(side, unit)
            .map_or(f64::INFINITY, |upper| upper - flow);
        let below = cnec
            .lower_bound(side, unit)
            .map_or(f64::INFINITY, |lower| flow - lower);

        // Flow the PST can still remove / add by moving to the end of its range
        let room_down = (setpoint - min_setpoint).max(0.0);
        let room_up = (max_setpoint - setpoint).max(0.0);
        let (decrease, increase) = if sensitivity >= 0.0 {
            (room_down * sensitivity, room_up * sensitivity)
        } else {
            (room_up * -sensitivity, room_down * -sensitivity)
        };

        above + decrease > 0.0 && below + increase > 0.0
    }
}

impl MarginEvaluator for MarginEvaluatorWithPstLimitationUnoptimizedCnecs {
    fn margin_on_side(
        &self,
        input: &EvaluationInput<'_>,
        cnec: &FlowCnec,
        side: Side,
        unit: Unit,
    ) -> f64 {
        match self.cnecs_in_series.get(cnec.id()) {
            Some(pst) if self.pst_can_secure(input, cnec, side, unit, pst) => {
                trace!(
                    cnec = cnec.id(),
                    pst = pst.id(),
                    ?side,
                    "CNEC can be secured by its PST, not limiting"
                );
                f64::MAX
            }
            _ => self.base.margin_on_side(input, cnec, side, unit),
        }
    }

    fn margin(&self, input: &EvaluationInput<'_>, cnec: &FlowCnec, unit: Unit) -> f64 {
        if !self.cnecs_in_series.contains_key(cnec.id()) {
            return self.base.margin(input, cnec, unit);
        }
        cnec.monitored_sides()
            .into_iter()
            .map(|side| self.margin_on_side(input, cnec, side, unit))
            .fold(f64::INFINITY, nan_aware_min)
    }
}

//! Contracts of the flow, sensitivity and range-action activation results.
//!
//! These are produced outside this crate (load flow, sensitivity analysis,
//! linear optimization) for every candidate combination of remedial actions
//! and consumed read-only by the evaluators. Any value may be `NaN`, meaning
//! "not computed for this CNEC/side/unit"; use [`defined`] before comparing.
//!
//! In-memory implementations live in [`crate::snapshot`].

use crate::cnec::{FlowCnec, Side};
use crate::remedial_action::RangeAction;
use crate::state::State;
use crate::units::Unit;
use serde::{Deserialize, Serialize};

/// Floor applied to zonal PTDF sums before dividing a margin by them.
pub const MIN_PTDF_ZONAL_SUM: f64 = 0.01;

/// `None` for `NaN`, `Some(value)` otherwise.
#[inline]
pub fn defined(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}

/// Minimum that propagates `NaN` instead of ignoring it like [`f64::min`].
#[inline]
pub fn nan_aware_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

/// Outcome of a sensitivity computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComputationStatus {
    /// Succeeded normally
    #[default]
    Default,
    /// Succeeded through a degraded computation path
    Fallback,
    /// Produced no result
    Failure,
}

/// Flows on CNECs for one network situation.
pub trait FlowResult: Send + Sync {
    fn flow(&self, cnec: &FlowCnec, side: Side, unit: Unit) -> f64;

    fn commercial_flow(&self, cnec: &FlowCnec, side: Side, unit: Unit) -> f64;

    /// Sum of zonal PTDFs of the CNEC's element, used by relative margins.
    fn ptdf_zonal_sum(&self, cnec: &FlowCnec, side: Side) -> f64;

    fn margin_on_side(&self, cnec: &FlowCnec, side: Side, unit: Unit) -> f64 {
        cnec.compute_margin(self.flow(cnec, side, unit), side, unit)
    }

    /// Worst margin over the CNEC's monitored sides.
    fn margin(&self, cnec: &FlowCnec, unit: Unit) -> f64 {
        worst_side_margin(self, cnec, unit)
    }

    /// Positive margins divided by the zonal PTDF sum; negative margins as is.
    fn relative_margin(&self, cnec: &FlowCnec, unit: Unit) -> f64 {
        worst_side_relative_margin(self, cnec, unit)
    }

    fn loop_flow(&self, cnec: &FlowCnec, side: Side, unit: Unit) -> f64 {
        self.flow(cnec, side, unit) - self.commercial_flow(cnec, side, unit)
    }
}

/// Default [`FlowResult::margin`], reusable by implementors overriding it.
pub fn worst_side_margin<F: FlowResult + ?Sized>(result: &F, cnec: &FlowCnec, unit: Unit) -> f64 {
    cnec.monitored_sides()
        .into_iter()
        .map(|side| result.margin_on_side(cnec, side, unit))
        .fold(f64::INFINITY, nan_aware_min)
}

/// Default [`FlowResult::relative_margin`], reusable by implementors.
pub fn worst_side_relative_margin<F: FlowResult + ?Sized>(
    result: &F,
    cnec: &FlowCnec,
    unit: Unit,
) -> f64 {
    cnec.monitored_sides()
        .into_iter()
        .map(|side| {
            let margin = result.margin_on_side(cnec, side, unit);
            if margin > 0.0 {
                margin / result.ptdf_zonal_sum(cnec, side).max(MIN_PTDF_ZONAL_SUM)
            } else {
                margin
            }
        })
        .fold(f64::INFINITY, nan_aware_min)
}

/// Sensitivities of CNEC flows to range-action setpoints.
pub trait SensitivityResult: Send + Sync {
    /// Status of the whole computation.
    fn sensitivity_status(&self) -> ComputationStatus;

    /// Status of the computation for one state.
    fn sensitivity_status_for(&self, state: &State) -> ComputationStatus;

    /// d(flow)/d(setpoint), flow expressed in `unit`.
    fn sensitivity_value(
        &self,
        cnec: &FlowCnec,
        side: Side,
        range_action: &RangeAction,
        unit: Unit,
    ) -> f64;
}

/// Setpoints chosen for range actions.
pub trait RangeActionActivationResult: Send + Sync {
    fn optimized_setpoint(&self, range_action: &RangeAction, state: &State) -> f64;

    /// Ids of range actions explicitly activated in `state`.
    fn activated_range_actions(&self, state: &State) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defined() {
        assert_eq!(defined(3.0), Some(3.0));
        assert_eq!(defined(f64::NAN), None);
        assert_eq!(defined(f64::INFINITY), Some(f64::INFINITY));
    }

    #[test]
    fn test_nan_aware_min() {
        assert_eq!(nan_aware_min(1.0, 2.0), 1.0);
        assert!(nan_aware_min(f64::NAN, 2.0).is_nan());
        assert!(nan_aware_min(1.0, f64::NAN).is_nan());
        // f64::min would have swallowed the NaN
        assert_eq!(f64::NAN.min(2.0), 2.0);
    }

    #[test]
    fn test_status_default() {
        assert_eq!(ComputationStatus::default(), ComputationStatus::Default);
    }
}

//! # rao-core: Remedial Action Optimization Model
//!
//! Provides the data model shared by every stage of a remedial action
//! optimization (RAO): the operational timeline, the CRAC catalog and the
//! contracts of the flow/sensitivity results the evaluators consume.
//!
//! ## Timeline
//!
//! A situation is a [`State`]: an [`Instant`] of the timeline, optionally
//! following a [`Contingency`]. The preventive state is the only state
//! without a contingency.
//!
//! ```text
//! preventive ──► outage ──► auto ──► curative 1 ──► curative 2 ...
//!                  │          │          │
//!                co1 - outage ... co1 - curative 1 (one state per pair)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rao_core::*;
//!
//! # fn main() -> CoreResult<()> {
//! let mut crac = Crac::new("crac");
//! crac.add_instant("preventive", InstantKind::Preventive)?;
//! crac.add_instant("outage", InstantKind::Outage)?;
//! crac.add_instant("curative", InstantKind::Curative)?;
//!
//! crac.add_contingency(Contingency::single_branch("co1", "line-1"))?;
//! let state = crac.add_state("co1", "curative")?;
//!
//! let cnec = FlowCnec::builder("cnec-1", "line-2", state)
//!     .threshold(BranchThreshold::symmetric(Side::One, Unit::Megawatt, 1000.0))
//!     .build()?;
//! crac.add_flow_cnec(cnec)?;
//!
//! assert_eq!(crac.states().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Data Structures
//!
//! - [`Crac`] - Catalog of instants, states, CNECs and remedial actions
//! - [`FlowCnec`] - Monitored branch with thresholds, in one state
//! - [`NetworkAction`] / [`RangeAction`] - The two remedial-action families
//! - [`RaUsageLimits`] - Per-instant caps on remedial-action usage
//!
//! ## Result Contracts
//!
//! - [`FlowResult`] - Flows, margins and loop flows on CNECs
//! - [`SensitivityResult`] - Sensitivities and computation status
//! - [`RangeActionActivationResult`] - Optimized range-action setpoints
//!
//! In-memory implementations are in [`snapshot`]; ready-made catalogs for
//! tests are in [`test_fixtures`].

pub mod cnec;
pub mod contingency;
pub mod crac;
pub mod diagnostics;
pub mod error;
pub mod instant;
pub mod remedial_action;
pub mod result;
pub mod snapshot;
pub mod state;
pub mod test_fixtures;
pub mod units;
pub mod usage_limits;

pub use cnec::{BranchThreshold, FlowCnec, FlowCnecBuilder, LoopFlowThreshold, Side};
pub use contingency::{Contingency, ContingencyElement, ContingencyElementKind};
pub use crac::Crac;
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{CoreResult, RaoError};
pub use instant::{Instant, InstantKind};
pub use remedial_action::{
    ActionType, ElementaryAction, NetworkAction, RangeAction, RangeActionKind, RangeType,
    RemedialAction, RemedialActionRef, StandardRange, UsageMethod, UsageRule,
};
pub use result::{
    defined, nan_aware_min, ComputationStatus, FlowResult, RangeActionActivationResult,
    SensitivityResult,
};
pub use snapshot::{ActivationSnapshot, FlowSnapshot, SensitivitySnapshot};
pub use state::State;
pub use units::{Amperes, Kilovolts, Megawatts, Unit};
pub use usage_limits::{Limit, LimitViolation, RaUsageLimits};

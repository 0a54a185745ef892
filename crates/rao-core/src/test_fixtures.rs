//! Small, fully-wired catalogs for tests and examples.
//!
//! Used by this crate's tests and by downstream crates that need a
//! realistic [`Crac`] without going through a CRAC importer.

use crate::cnec::{BranchThreshold, FlowCnec, Side};
use crate::contingency::Contingency;
use crate::crac::Crac;
use crate::error::CoreResult;
use crate::instant::InstantKind;
use crate::remedial_action::{
    ActionType, NetworkAction, RangeAction, RangeType, StandardRange, UsageMethod, UsageRule,
};
use crate::state::State;
use crate::units::Unit;
use crate::usage_limits::RaUsageLimits;
use std::collections::BTreeMap;

pub const PREVENTIVE: &str = "preventive";
pub const OUTAGE: &str = "outage";
pub const AUTO: &str = "auto";
pub const CURATIVE: &str = "curative";

/// Nominal voltage of every fixture CNEC, in kV.
pub const NOMINAL_VOLTAGE: f64 = 400.0;

/// A CNEC with a symmetric MW threshold on side one.
pub fn symmetric_cnec(
    id: &str,
    state: &State,
    limit_mw: f64,
    optimized: bool,
    monitored: bool,
) -> CoreResult<FlowCnec> {
    FlowCnec::builder(id, format!("{id}-line"), state.clone())
        .optimized(optimized)
        .monitored(monitored)
        .nominal_voltages(NOMINAL_VOLTAGE)
        .threshold(BranchThreshold::symmetric(
            Side::One,
            Unit::Megawatt,
            limit_mw,
        ))
        .build()
}

/// A CRAC with the four instant kinds and nothing else.
pub fn timeline_crac() -> CoreResult<Crac> {
    let mut crac = Crac::new("timeline");
    crac.add_instant(PREVENTIVE, InstantKind::Preventive)?;
    crac.add_instant(OUTAGE, InstantKind::Outage)?;
    crac.add_instant(AUTO, InstantKind::Auto)?;
    crac.add_instant(CURATIVE, InstantKind::Curative)?;
    Ok(crac)
}

/// PST with taps -16..=16, 0.5° per tap, starting at tap 0.
pub fn pst(id: &str) -> CoreResult<RangeAction> {
    let taps: BTreeMap<i32, f64> = (-16..=16).map(|tap| (tap, tap as f64 * 0.5)).collect();
    RangeAction::pst(id, format!("{id}-transformer"), taps, 0)
}

/// Two contingencies, CNECs in most states and three remedial actions.
///
/// | CNEC                | state           | limit (MW) | role      |
/// |---------------------|-----------------|-----------:|-----------|
/// | `cnec-prev`         | preventive      |       1000 | optimized |
/// | `cnec-co1-outage`   | co1 - outage    |       1000 | optimized |
/// | `cnec-co1-curative` | co1 - curative  |       1000 | optimized |
/// | `cnec-co2-curative` | co2 - curative  |        500 | optimized |
/// | `mnec-prev`         | preventive      |       1000 | monitored |
///
/// Remedial actions: `pst-1` (FR, preventive, taps ±10), `open-line-4`
/// (BE, curative) and `close-line-5` (BE, forced after co1). Curative
/// usage is capped at two remedial actions.
pub fn sample_crac() -> CoreResult<Crac> {
    let mut crac = timeline_crac()?;
    crac.add_contingency(Contingency::single_branch("co1", "line-1").with_name("Line 1 trip"))?;
    crac.add_contingency(Contingency::single_branch("co2", "line-2").with_name("Line 2 trip"))?;
    let co1_outage = crac.add_state("co1", OUTAGE)?;
    let co1_curative = crac.add_state("co1", CURATIVE)?;
    let co2_curative = crac.add_state("co2", CURATIVE)?;
    let preventive = crac.preventive_state()?.clone();

    crac.add_flow_cnec(symmetric_cnec("cnec-prev", &preventive, 1000.0, true, false)?)?;
    crac.add_flow_cnec(symmetric_cnec("cnec-co1-outage", &co1_outage, 1000.0, true, false)?)?;
    crac.add_flow_cnec(symmetric_cnec("cnec-co1-curative", &co1_curative, 1000.0, true, false)?)?;
    crac.add_flow_cnec(symmetric_cnec("cnec-co2-curative", &co2_curative, 500.0, true, false)?)?;
    crac.add_flow_cnec(symmetric_cnec("mnec-prev", &preventive, 1000.0, false, true)?)?;

    crac.add_range_action(
        pst("pst-1")?
            .with_operator("FR")
            .with_range(StandardRange::new(-10.0, 10.0, RangeType::Absolute))
            .with_usage_rule(UsageRule::on_instant(PREVENTIVE, UsageMethod::Available)),
    )?;
    crac.add_network_action(
        NetworkAction::topological("open-line-4", "line-4", ActionType::Open)
            .with_operator("BE")
            .with_usage_rule(UsageRule::on_instant(CURATIVE, UsageMethod::Available)),
    )?;
    crac.add_network_action(
        NetworkAction::topological("close-line-5", "line-5", ActionType::Close)
            .with_operator("BE")
            .with_usage_rule(UsageRule::on_contingency_state(
                "co1",
                CURATIVE,
                UsageMethod::Forced,
            )),
    )?;

    let mut curative_limits = RaUsageLimits::new();
    curative_limits.set_max_ra(2);
    crac.set_ra_usage_limits(CURATIVE, curative_limits)?;

    Ok(crac)
}

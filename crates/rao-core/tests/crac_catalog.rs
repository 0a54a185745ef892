//! Integration tests for the CRAC catalog built from the shared fixtures.

use rao_core::test_fixtures::{sample_crac, symmetric_cnec, timeline_crac, CURATIVE, OUTAGE};
use rao_core::{
    ComputationStatus, Contingency, FlowResult, FlowSnapshot, InstantKind, LimitViolation,
    RaUsageLimits, RaoError, RemedialAction, RemedialActionRef, SensitivityResult,
    SensitivitySnapshot, Side, Unit,
};
use std::collections::HashMap;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_state_ordering_follows_timeline() {
    let crac = sample_crac().unwrap();
    let preventive = crac.preventive_state().unwrap();
    let co1_outage = crac.state(Some("co1"), OUTAGE).unwrap();
    let co1_curative = crac.state(Some("co1"), CURATIVE).unwrap();

    assert!(preventive.comes_before(co1_outage).unwrap());
    assert!(co1_outage.comes_before(co1_curative).unwrap());
    assert!(!co1_curative.comes_before(preventive).unwrap());

    let states: Vec<&str> = crac
        .states_of_contingency("co1")
        .iter()
        .map(|s| s.id())
        .collect();
    assert_eq!(states, vec!["co1 - outage", "co1 - curative"]);
}

#[test]
fn test_cnec_margins_through_snapshot() {
    let crac = sample_crac().unwrap();
    let cnec = crac.flow_cnec("cnec-co2-curative").unwrap();
    let flows = FlowSnapshot::new().with_flow(cnec.id(), Side::One, Unit::Megawatt, 650.0);

    assert_eq!(flows.margin(cnec, Unit::Megawatt), -150.0);
    // 500 MW at 400 kV
    let expected_amperes = 500.0 * 1000.0 / (3f64.sqrt() * 400.0);
    let upper = cnec.upper_bound(Side::One, Unit::Ampere).unwrap();
    assert!((upper - expected_amperes).abs() < 1e-9);
}

#[test]
fn test_post_contingency_cnec_needs_registered_state() {
    let mut crac = timeline_crac().unwrap();
    crac.add_contingency(Contingency::single_branch("co1", "line-1"))
        .unwrap();
    let mut other = timeline_crac().unwrap();
    other
        .add_contingency(Contingency::single_branch("co1", "line-1"))
        .unwrap();
    let foreign_state = other.add_state("co1", CURATIVE).unwrap();

    let cnec = symmetric_cnec("cnec", &foreign_state, 100.0, true, false).unwrap();
    let err = crac.add_flow_cnec(cnec).unwrap_err();
    assert!(matches!(err, RaoError::Validation(_)), "{err}");

    crac.add_state("co1", CURATIVE).unwrap();
    let cnec = symmetric_cnec("cnec", &foreign_state, 100.0, true, false).unwrap();
    assert!(crac.add_flow_cnec(cnec).is_ok());
}

#[test]
fn test_usage_limits_on_curative_combination() {
    init_tracing();
    let crac = sample_crac().unwrap();
    let limits = crac.ra_usage_limits(CURATIVE).unwrap();
    let open = crac.network_action("open-line-4").unwrap();
    let close = crac.network_action("close-line-5").unwrap();
    let pst = crac.range_action("pst-1").unwrap();

    let two = [RemedialActionRef::Network(open), RemedialActionRef::Network(close)];
    assert!(limits.check(&two).is_empty());

    let three = [
        RemedialActionRef::Network(open),
        RemedialActionRef::Network(close),
        RemedialActionRef::Range(pst),
    ];
    assert_eq!(
        limits.check(&three),
        vec![LimitViolation::TooManyRemedialActions { count: 3, max: 2 }]
    );
}

#[test]
fn test_usage_limits_reject_inconsistent_operator_caps() {
    init_tracing();
    let mut limits = RaUsageLimits::new();
    limits
        .set_max_ra_per_tso(HashMap::from([("BE".to_string(), 1)]))
        .unwrap();
    let err = limits
        .set_max_topo_per_tso(HashMap::from([("BE".to_string(), 3)]))
        .unwrap_err();
    assert!(err.to_string().contains("BE"));
    assert_eq!(limits.max_topo_per_tso("BE"), rao_core::Limit::Unbounded);

    // negative values are clamped, not rejected
    limits.set_max_tso(-4);
    assert_eq!(limits.max_tso(), rao_core::Limit::AtMost(0));
}

#[test]
fn test_sensitivity_status_per_state() {
    let crac = sample_crac().unwrap();
    let co1_curative = crac.state(Some("co1"), CURATIVE).unwrap();
    let sensi = SensitivitySnapshot::new(ComputationStatus::Default)
        .with_state_status(co1_curative.id(), ComputationStatus::Failure);

    assert_eq!(sensi.sensitivity_status(), ComputationStatus::Default);
    assert_eq!(
        sensi.sensitivity_status_for(co1_curative),
        ComputationStatus::Failure
    );
    assert_eq!(
        sensi.sensitivity_status_for(crac.preventive_state().unwrap()),
        ComputationStatus::Default
    );
}

#[test]
fn test_remedial_action_lookup() {
    let crac = sample_crac().unwrap();
    assert_eq!(crac.network_actions().len(), 2);
    assert_eq!(crac.range_actions().len(), 1);
    assert_eq!(
        crac.network_action("open-line-4").unwrap().operator(),
        Some("BE")
    );
    assert!(crac.range_action("open-line-4").is_none());
    assert_eq!(
        crac.instants_of_kind(InstantKind::Auto)[0].id(),
        "auto"
    );
}

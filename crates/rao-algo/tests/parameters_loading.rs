//! Loading RAO parameters from files.

use rao_algo::{MarginUnit, ObjectiveFunctionType, RaoParameters};
use rao_core::test_fixtures::{sample_crac, CURATIVE};
use rao_core::Limit;
use std::fs;
use tempfile::tempdir;

const YAML: &str = r#"
objective_function:
  type: max_min_relative_margin
  unit: ampere
mnec:
  acceptable_margin_decrease: 20
loop_flow:
  violation_cost: 1.5
ra_usage_limits_per_instant:
  curative:
    max_ra: 3
    max_tso: 1
    max_tso_exclusion: [FR]
"#;

const JSON: &str = r#"{
  "objective_function": { "type": "max_min_margin" },
  "sensitivity": { "fallback_overcost": 12.5 },
  "unoptimized_cnecs_in_series_with_psts": { "cnec-prev": "pst-1" }
}"#;

#[test]
fn test_load_yaml_by_extension() {
    let dir = tempdir().unwrap();
    for name in ["params.yaml", "params.yml"] {
        let path = dir.path().join(name);
        fs::write(&path, YAML).unwrap();

        let params = RaoParameters::load(&path).unwrap();
        assert_eq!(
            params.objective_function.kind,
            ObjectiveFunctionType::MaxMinRelativeMargin
        );
        assert_eq!(params.objective_function.unit, MarginUnit::Ampere);
        assert_eq!(params.mnec.acceptable_margin_decrease, 20.0);
        assert_eq!(params.mnec.violation_cost, 10.0, "unset fields keep defaults");
        assert_eq!(params.loop_flow.violation_cost, 1.5);
    }
}

#[test]
fn test_load_json_by_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.json");
    fs::write(&path, JSON).unwrap();

    let params = RaoParameters::load(&path).unwrap();
    assert_eq!(params.sensitivity.fallback_overcost, 12.5);
    assert_eq!(
        params.unoptimized_cnecs_in_series_with_psts.get("cnec-prev"),
        Some(&"pst-1".to_string())
    );
    params.validate(&sample_crac().unwrap()).unwrap();
}

#[test]
fn test_unknown_extension_tries_both_formats() {
    let dir = tempdir().unwrap();
    let yaml_path = dir.path().join("params.conf");
    fs::write(&yaml_path, YAML).unwrap();
    assert_eq!(
        RaoParameters::load(&yaml_path)
            .unwrap()
            .objective_function
            .unit,
        MarginUnit::Ampere
    );

    let json_path = dir.path().join("params");
    fs::write(&json_path, JSON).unwrap();
    assert_eq!(
        RaoParameters::load(&json_path)
            .unwrap()
            .sensitivity
            .fallback_overcost,
        12.5
    );
}

#[test]
fn test_missing_file_names_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.yaml");
    let err = RaoParameters::load(&path).unwrap_err();
    assert!(
        format!("{err:#}").contains("missing.yaml"),
        "error should name the file: {err:#}"
    );
}

#[test]
fn test_malformed_json_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.json");
    fs::write(&path, r#"{ "mnec": { "violation_cost": "high" } }"#).unwrap();
    assert!(RaoParameters::load(&path).is_err());
}

#[test]
fn test_loaded_usage_limits_reach_the_crac() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.yaml");
    fs::write(&path, YAML).unwrap();
    let params = RaoParameters::load(&path).unwrap();

    let mut crac = sample_crac().unwrap();
    params.validate(&crac).unwrap();
    params.apply_usage_limits(&mut crac).unwrap();

    let limits = crac.ra_usage_limits(CURATIVE).unwrap();
    assert_eq!(limits.max_ra(), Limit::AtMost(3));
    assert_eq!(limits.max_tso(), Limit::AtMost(1));
    assert!(limits.max_tso_exclusion().contains("FR"));
    assert_eq!(limits.max_topo(), Limit::Unbounded);
}

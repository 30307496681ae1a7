// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deep validation tests for `frl-config`.

use frl_config::{
    ConfigError, ConfigWarning, KindEntry, TaxonomyConfig, build_registry, parse_toml,
    validate_config,
};
use frl_core::ErrorKind;
use http::StatusCode;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn entry(code: u32, status: u16) -> KindEntry {
    KindEntry {
        code,
        status: Some(status),
        loggable: true,
        public_message: None,
        summary: None,
        required_context: Vec::new(),
    }
}

/// Fully-specified config with no validation warnings.
fn fully_valid_config() -> TaxonomyConfig {
    let mut kinds = BTreeMap::new();
    kinds.insert(
        "UserNotFound".into(),
        KindEntry {
            code: 1404,
            status: Some(404),
            loggable: false,
            public_message: Some("User not found".into()),
            summary: Some("user lookup failed".into()),
            required_context: vec!["user_id".into()],
        },
    );
    kinds.insert("DatabaseUnavailable".into(), entry(1503, 503));
    TaxonomyConfig {
        generic_fallback: Some("Something went wrong".into()),
        kinds,
    }
}

/// Extract error reasons from a `ConfigError::ValidationError`.
fn validation_reasons(err: ConfigError) -> Vec<String> {
    match err {
        ConfigError::ValidationError { reasons } => reasons,
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

// ===========================================================================
// 1. Valid configs pass validation with no warnings
// ===========================================================================

#[test]
fn fully_specified_config_has_no_warnings() {
    let warnings = validate_config(&fully_valid_config()).unwrap();
    assert!(warnings.is_empty(), "expected zero warnings: {warnings:?}");
}

#[test]
fn status_boundaries_100_and_599_are_valid() {
    for status in [100u16, 599] {
        let mut cfg = fully_valid_config();
        cfg.kinds.insert("Edge".into(), entry(42, status));
        // 1xx/5xx statuses never trigger the client-message warning.
        validate_config(&cfg)
            .unwrap_or_else(|e| panic!("status {status} should be valid: {e}"));
    }
}

#[test]
fn empty_kind_table_is_valid() {
    let cfg = TaxonomyConfig::default();
    assert!(validate_config(&cfg).unwrap().is_empty());
    let registry = build_registry(&cfg).unwrap();
    assert!(registry.is_empty());
}

// ===========================================================================
// 2. Out-of-range statuses are hard errors
// ===========================================================================

#[test]
fn statuses_outside_100_to_599_are_errors() {
    for status in [0u16, 99, 600, 700, 999, 1000] {
        let mut cfg = fully_valid_config();
        cfg.kinds.insert("Edge".into(), entry(42, status));
        let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
        assert!(
            reasons.iter().any(|r| r.contains(&status.to_string())),
            "status {status} should be named in {reasons:?}"
        );
    }
}

// ===========================================================================
// 3. Every problem surfaces in one pass
// ===========================================================================

#[test]
fn all_errors_are_collected_before_failing() {
    let mut cfg = TaxonomyConfig::default();
    cfg.kinds.insert("A".into(), entry(0, 500));
    cfg.kinds.insert("B".into(), entry(7, 999));
    cfg.kinds.insert("C".into(), entry(7, 503));
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert_eq!(reasons.len(), 3, "reserved + invalid status + duplicate: {reasons:?}");
    assert!(reasons.iter().any(|r| r.contains("reserved")));
    assert!(reasons.iter().any(|r| r.contains("999")));
    assert!(reasons.iter().any(|r| r.contains("already used")));
}

#[test]
fn empty_required_context_entry_is_an_error() {
    let mut cfg = TaxonomyConfig::default();
    let mut e = entry(7, 503);
    e.required_context = vec!["ok".into(), String::new()];
    cfg.kinds.insert("A".into(), e);
    let reasons = validation_reasons(validate_config(&cfg).unwrap_err());
    assert!(reasons.iter().any(|r| r.contains("required_context")));
}

// ===========================================================================
// 4. Warning matrix
// ===========================================================================

#[test]
fn every_4xx_without_public_message_warns() {
    for status in [400u16, 404, 410, 429] {
        let mut cfg = TaxonomyConfig::default();
        cfg.kinds.insert("Client".into(), entry(7, status));
        let warnings = validate_config(&cfg).unwrap();
        assert_eq!(
            warnings,
            vec![ConfigWarning::MissingPublicMessage {
                kind: "Client".into(),
                status,
            }]
        );
    }
}

#[test]
fn public_message_silences_the_4xx_warning() {
    let mut cfg = TaxonomyConfig::default();
    let mut e = entry(7, 404);
    e.public_message = Some("Not here".into());
    cfg.kinds.insert("Client".into(), e);
    assert!(validate_config(&cfg).unwrap().is_empty());
}

#[test]
fn quiet_5xx_warns_but_quiet_4xx_does_not() {
    let mut cfg = TaxonomyConfig::default();
    let mut server = entry(7, 503);
    server.loggable = false;
    cfg.kinds.insert("Server".into(), server);
    let mut client = entry(8, 404);
    client.loggable = false;
    client.public_message = Some("Gone".into());
    cfg.kinds.insert("Client".into(), client);

    let warnings = validate_config(&cfg).unwrap();
    assert_eq!(
        warnings,
        vec![ConfigWarning::SuppressedServerError {
            kind: "Server".into()
        }]
    );
}

#[test]
fn warnings_never_block_registry_construction() {
    let mut cfg = TaxonomyConfig::default();
    cfg.kinds.insert("Client".into(), entry(7, 404));
    assert!(!validate_config(&cfg).unwrap().is_empty());
    let registry = build_registry(&cfg).unwrap();
    assert_eq!(registry.len(), 1);
}

// ===========================================================================
// 5. build_registry carries every field through
// ===========================================================================

#[test]
fn registry_specs_match_the_config_entries() {
    let registry = build_registry(&fully_valid_config()).unwrap();
    assert_eq!(registry.len(), 2);

    let spec = registry.lookup(&ErrorKind::new("UserNotFound")).unwrap();
    assert_eq!(spec.code(), 1404);
    assert_eq!(spec.summary_text(), "user lookup failed");
    assert_eq!(spec.required_context(), ["user_id"]);
    let caps = spec.capabilities();
    assert!(!caps.loggable);
    assert_eq!(caps.http_status, StatusCode::NOT_FOUND);
    assert_eq!(caps.public_message.as_deref(), Some("User not found"));
}

#[test]
fn omitted_fields_take_their_defaults() {
    let mut cfg = TaxonomyConfig::default();
    cfg.kinds.insert(
        "Bare".into(),
        KindEntry {
            code: 9,
            status: None,
            loggable: true,
            public_message: None,
            summary: None,
            required_context: Vec::new(),
        },
    );
    let registry = build_registry(&cfg).unwrap();
    let spec = registry.lookup(&ErrorKind::new("Bare")).unwrap();
    // Summary falls back to the kind name, status to 500.
    assert_eq!(spec.summary_text(), "Bare");
    assert_eq!(spec.capabilities().http_status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(spec.capabilities().loggable);
    assert!(spec.capabilities().public_message.is_none());
}

#[test]
fn build_registry_rejects_what_validation_rejects() {
    let mut cfg = TaxonomyConfig::default();
    cfg.kinds.insert("A".into(), entry(0, 500));
    assert!(matches!(
        build_registry(&cfg),
        Err(ConfigError::ValidationError { .. })
    ));
}

// ===========================================================================
// 6. TOML round trip
// ===========================================================================

#[test]
fn config_survives_a_toml_round_trip() {
    let cfg = fully_valid_config();
    let serialized = toml::to_string(&cfg).expect("config serializes");
    let back = parse_toml(&serialized).expect("serialized config parses");
    assert_eq!(back, cfg);
}

#[test]
fn scalar_kind_entry_is_a_parse_error() {
    // A kind entry is a table; scalar values cannot stand in for one.
    let err = parse_toml("[kinds]\nUserNotFound = 3\n").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

//! Tests for error types

use lift_db::Error;

#[test]
fn test_experiment_not_found_error() {
    let error = Error::ExperimentNotFound("exp-404".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Experiment not found"));
    assert!(error_str.contains("exp-404"));
}

#[test]
fn test_no_control_variant_error() {
    let error = Error::NoControlVariant("exp-1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("no control variant"));
    assert!(error_str.contains("is_control = true"));
}

#[test]
fn test_insufficient_data_error() {
    let error = Error::InsufficientData {
        required: 30,
        control: 12,
        treatment: 31,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Insufficient data"));
    assert!(error_str.contains("need 30"));
    assert!(error_str.contains("control=12"));
    assert!(error_str.contains("treatment=31"));
}

#[test]
fn test_invalid_transition_error() {
    let error = Error::InvalidTransition {
        id: "exp-1".to_string(),
        from: "completed".to_string(),
        to: "running".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("exp-1"));
    assert!(error_str.contains("completed -> running"));
}

#[test]
fn test_unknown_variant_error() {
    let error = Error::UnknownVariant {
        experiment_id: "exp-1".to_string(),
        variant_id: "ghost".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Variant ghost"));
    assert!(error_str.contains("exp-1"));
}

#[test]
fn test_simple_message_errors() {
    let cases = [
        (Error::InvalidExperiment("two controls".into()), "Invalid experiment"),
        (Error::ExperimentClosed("exp-9".into()), "closed"),
        (Error::InvalidObservation("count is zero".into()), "Invalid observation"),
        (Error::Config("bad threshold".into()), "Configuration error"),
        (Error::Repository("disk full".into()), "Repository error"),
    ];
    for (error, needle) in cases {
        assert!(format!("{error}").contains(needle), "{error}");
    }
}

#[test]
fn test_serialization_error_from_serde() {
    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: Error = json_err.into();
    assert!(matches!(error, Error::Serialization(_)));
    assert!(format!("{error}").contains("Serialization error"));
}

#[test]
fn test_error_debug() {
    let error = Error::ExperimentNotFound("debug".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("ExperimentNotFound"));
}

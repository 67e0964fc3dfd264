use mcs_core::errors::{ErrorInfo, McsError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("slot", "3")
        .with_context("node", "kappa")
}

#[test]
fn config_error_surface() {
    let err = McsError::Config(sample_info("exclusive-options", "both set"));
    assert!(err.is_config());
    assert_eq!(err.info().code, "exclusive-options");
}

#[test]
fn state_error_display_includes_context_and_hint() {
    let err = McsError::State(sample_info("copy-failed", "tree invalid").with_hint("validate first"));
    assert!(!err.is_config());
    assert_eq!(
        err.to_string(),
        "state error: tree invalid (code: copy-failed) | context: [node=kappa, slot=3] | hint: validate first"
    );
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = McsError::Kernel(sample_info("K001", "bad offset"));
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "Kernel");
    assert_eq!(json["detail"]["code"], "K001");
    let back: McsError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}

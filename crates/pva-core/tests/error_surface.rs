use pva_core::errors::{ErrorInfo, PvaError, PvaWarning};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("model", "gompertz")
        .with_context("chain", "1")
}

#[test]
fn configuration_error_surface() {
    let err = PvaError::Configuration(sample_info("CFG001", "wrong length"));
    assert_eq!(err.info().code, "CFG001");
    assert!(err.info().context.contains_key("model"));
}

#[test]
fn numerical_error_surface() {
    let err = PvaError::Numerical(sample_info("NUM001", "non-finite density"));
    assert_eq!(err.info().code, "NUM001");
    assert!(err.to_string().starts_with("numerical error"));
}

#[test]
fn serde_error_surface() {
    let err = PvaError::serde("S001", "schema mismatch");
    assert_eq!(err.info().code, "S001");
}

#[test]
fn display_includes_context_and_hint() {
    let info = sample_info("CFG002", "bad thinning").with_hint("use a thinning of at least 1");
    let rendered = info.to_string();
    assert!(rendered.contains("chain=1"));
    assert!(rendered.contains("hint: use a thinning"));
}

#[test]
fn warnings_serialize_with_kind_tag() {
    let warning = PvaWarning::NonConvergence(sample_info("rhat", "split R-hat above 1.1"));
    let json = serde_json::to_string(&warning).unwrap();
    assert!(json.contains("\"kind\":\"non-convergence\""));
    let back: PvaWarning = serde_json::from_str(&json).unwrap();
    assert_eq!(back, warning);
}

//! Tests for domain error construction and serialisation.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::invalid_reference("unknown tag"), ErrorCode::InvalidReference)]
#[case(Error::conflict("taken"), ErrorCode::Conflict)]
#[case(Error::storage_failure("down"), ErrorCode::StorageFailure)]
fn constructors_set_code(#[case] err: Error, #[case] expected: ErrorCode) {
    assert_eq!(err.code(), expected);
}

#[rstest]
#[case("")]
#[case("   ")]
fn try_new_rejects_empty_messages(#[case] message: &str) {
    let result = Error::try_new(ErrorCode::Conflict, message);
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn display_uses_message() {
    let err = Error::conflict("banner already claimed");
    assert_eq!(err.to_string(), "banner already claimed");
}

#[rstest]
fn serialises_with_snake_case_code_and_details() {
    let err = Error::conflict("revision mismatch")
        .with_details(json!({ "expectedRevision": 2, "actualRevision": 3 }));

    let value = serde_json::to_value(&err).expect("error serialises");

    assert_eq!(
        value,
        json!({
            "code": "conflict",
            "message": "revision mismatch",
            "details": { "expectedRevision": 2, "actualRevision": 3 },
        })
    );
}

#[rstest]
fn serialisation_omits_absent_details() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("error serialises");
    assert!(value.get("details").is_none());
}

#[rstest]
fn deserialisation_rejects_blank_messages() {
    let payload = json!({ "code": "not_found", "message": " " });
    let result: Result<Error, _> = serde_json::from_value(payload);
    assert!(result.is_err());
}

#[rstest]
fn deserialisation_restores_storage_failure() {
    let payload = json!({ "code": "storage_failure", "message": "pool exhausted" });
    let err: Error = serde_json::from_value(payload).expect("valid payload");
    assert_eq!(err.code(), ErrorCode::StorageFailure);
    assert_eq!(err.message(), "pool exhausted");
    assert!(err.details().is_none());
}

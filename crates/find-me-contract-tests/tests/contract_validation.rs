//! Validates contract fixtures against frozen JSON schemas and checks that
//! the typed parsers agree with them.

use find_me_contract::{
    ContractError, error_detail, parse_classification_response, parse_history,
    parse_login_response,
};
use jsonschema::JSONSchema;
use serde_json::Value;

fn contract_path(name: &str) -> String {
    format!("{}/../../contracts/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn read(name: &str) -> String {
    std::fs::read_to_string(contract_path(name)).expect("contract file should be readable")
}

fn load_json(name: &str) -> Value {
    serde_json::from_str(&read(name)).expect("contract file should be valid json")
}

fn compile_validator(schema: &str) -> JSONSchema {
    JSONSchema::compile(&load_json(schema)).expect("schema should compile")
}

#[test]
fn classify_fixture_matches_schema() {
    let validator = compile_validator("classify-response.schema.json");
    let fixture = load_json("fixtures/classify-response.valid.json");
    assert!(
        validator.is_valid(&fixture),
        "classify fixture should validate against schema"
    );

    let parsed = parse_classification_response(&read("fixtures/classify-response.valid.json"))
        .expect("fixture should parse");
    assert_eq!(parsed.total(), 4);
}

#[test]
fn legacy_classify_body_fails_schema_and_parser() {
    let validator = compile_validator("classify-response.schema.json");
    let fixture = load_json("fixtures/classify-response.legacy.json");
    assert!(!validator.is_valid(&fixture));

    let error = parse_classification_response(&read("fixtures/classify-response.legacy.json"))
        .expect_err("legacy body should be rejected");
    assert!(matches!(error, ContractError::UnsupportedSchema(_)));
}

#[test]
fn login_fixture_matches_schema() {
    let validator = compile_validator("login-response.schema.json");
    let fixture = load_json("fixtures/login-response.valid.json");
    assert!(validator.is_valid(&fixture));

    let parsed = parse_login_response(&read("fixtures/login-response.valid.json"))
        .expect("fixture should parse");
    assert!(parsed.access_token.is_some());
}

#[test]
fn error_fixture_matches_schema() {
    let validator = compile_validator("error-response.schema.json");
    let fixture = load_json("fixtures/error-response.valid.json");
    assert!(validator.is_valid(&fixture));

    assert_eq!(
        error_detail(&read("fixtures/error-response.valid.json")).as_deref(),
        Some("field required")
    );
}

#[test]
fn history_fixture_matches_schema() {
    let validator = compile_validator("history-response.schema.json");
    let fixture = load_json("fixtures/history-response.valid.json");
    assert!(validator.is_valid(&fixture));

    let records =
        parse_history(&read("fixtures/history-response.valid.json")).expect("fixture should parse");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].matched_images.len(), 1);
}

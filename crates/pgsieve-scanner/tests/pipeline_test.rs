//! End-to-end dictionary creation against the in-memory backend.

mod common;

use common::{config_in, read_output, write_rules, MemoryBackend};
use pgsieve_core::ResultCode;
use pgsieve_scanner::{create_dictionary, run, ScanError};
use serde_json::json;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

const HASH_SSN: &str = r#"anon_funcs.digest("ssn", 'salt_word', 'md5')"#;
const HASH_NOTE: &str = r#"anon_funcs.digest("note", 'salt_word', 'md5')"#;

fn users_backend() -> MemoryBackend {
    // `id` is a serial primary key, which the catalog never returns
    MemoryBackend::new()
        .column("public", "users", "ssn", "text", &[Some("not obviously sensitive")])
        .column(
            "public",
            "users",
            "note",
            "text",
            &[Some("call me later"), None, Some("this is a SECRET")],
        )
}

fn mixed_backend() -> MemoryBackend {
    let mut backend = MemoryBackend::new();
    for schema in ["public", "billing", "audit"] {
        for table in ["accounts", "events"] {
            backend = backend
                .column(schema, table, "ssn", "text", &[Some("n/a")])
                .column(schema, table, "amount", "numeric(10,2)", &[Some("12.50")])
                .column(
                    schema,
                    table,
                    "created_at",
                    "timestamp without time zone",
                    &[Some("2020-01-01 00:00:00")],
                )
                .column(schema, table, "contact", "text", &[Some("mail bob@example.com")])
                .column(schema, table, "memo", "text", &[Some("internal secret memo")])
                .column(schema, table, "status", "text", &[Some("active"), Some("closed")]);
        }
    }
    backend
}

fn standard_rules() -> serde_json::Value {
    json!({
        "field_rules": ["^ssn$", "^amount$", "^created_at$"],
        "data_constants": ["Secret"],
        "data_regex": [r"\S+@\S+\.\S+"]
    })
}

#[tokio::test]
async fn test_users_scenario() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(
        temp_dir.path(),
        &json!({ "field_rules": ["^ssn$"], "data_constants": ["secret"], "data_regex": [] }),
    );
    let config = config_in(&temp_dir, 2);
    let (backend, _stats) = users_backend().into_shared();

    let summary = create_dictionary(&config, backend).await.unwrap();

    assert_eq!(summary.candidate_columns, 2);
    assert_eq!(summary.name_matches, 1);
    assert_eq!(summary.value_matches, 1);
    assert_eq!(summary.tables, 1);
    assert_eq!(summary.output_path, temp_dir.path().join("dict").join("output_dict.json"));

    assert_eq!(
        read_output(&config),
        json!({
            "dictionary": [{
                "schema": "public",
                "table": "users",
                "fields": { "ssn": HASH_SSN, "note": HASH_NOTE }
            }]
        })
    );
}

#[tokio::test]
async fn test_name_matches_are_never_sampled() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &json!({ "field_rules": ["^ssn$"] }));
    let config = config_in(&temp_dir, 3);
    let (backend, stats) = users_backend().into_shared();

    create_dictionary(&config, backend).await.unwrap();

    assert!(!stats.was_sampled("public.users.ssn"));
    assert!(stats.was_sampled("public.users.note"));

    // No constants or patterns, so only the name match is written
    let output = read_output(&config);
    assert_eq!(output["dictionary"][0]["fields"], json!({ "ssn": HASH_SSN }));
}

#[tokio::test]
async fn test_output_is_partition_independent() {
    let mut outputs = Vec::new();

    for workers in 1..=5 {
        let temp_dir = TempDir::new().unwrap();
        write_rules(temp_dir.path(), &standard_rules());
        let config = config_in(&temp_dir, workers);
        let (backend, _stats) = mixed_backend().into_shared();

        create_dictionary(&config, backend).await.unwrap();
        outputs.push(std::fs::read_to_string(config.paths.output_path()).unwrap());
    }

    for (index, output) in outputs.iter().enumerate().skip(1) {
        assert_eq!(output, &outputs[0], "output differs with {} workers", index + 1);
    }
}

#[tokio::test]
async fn test_repeated_runs_are_identical() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &standard_rules());
    let config = config_in(&temp_dir, 4);

    let (backend, _stats) = mixed_backend().into_shared();
    create_dictionary(&config, backend).await.unwrap();
    let first = std::fs::read_to_string(config.paths.output_path()).unwrap();

    let (backend, _stats) = mixed_backend().into_shared();
    create_dictionary(&config, backend).await.unwrap();
    let second = std::fs::read_to_string(config.paths.output_path()).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_content_detection_and_templates() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &standard_rules());
    let config = config_in(&temp_dir, 2);
    let (backend, _stats) = mixed_backend().into_shared();

    let summary = create_dictionary(&config, backend).await.unwrap();
    assert_eq!(summary.tables, 6);

    let output = read_output(&config);
    let first = &output["dictionary"][0];
    assert_eq!(first["schema"], "audit");
    assert_eq!(first["table"], "accounts");

    let fields = first["fields"].as_object().unwrap();
    assert_eq!(fields["ssn"], HASH_SSN);
    assert_eq!(fields["amount"], r#"anon_funcs.noise("amount", 10)"#);
    assert_eq!(
        fields["created_at"],
        r#"anon_funcs.dnoise("created_at", interval '6 month')"#
    );
    // Flagged by the value pattern and by the constant respectively
    assert!(fields.contains_key("contact"));
    assert!(fields.contains_key("memo"));
    // No constant and no pattern hit
    assert!(!fields.contains_key("status"));
    assert_eq!(fields.len(), 5);
}

#[tokio::test]
async fn test_constant_flags_column_without_pattern_match() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(
        temp_dir.path(),
        &json!({ "data_constants": ["secret"], "data_regex": [r"^\d{3}-\d{2}-\d{4}$"] }),
    );
    let config = config_in(&temp_dir, 1);
    let (backend, _stats) = users_backend().into_shared();

    create_dictionary(&config, backend).await.unwrap();

    let output = read_output(&config);
    assert_eq!(output["dictionary"][0]["fields"], json!({ "note": HASH_NOTE }));
}

#[tokio::test]
async fn test_column_error_fails_run_without_output() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &standard_rules());
    let config = config_in(&temp_dir, 3);
    let (backend, _stats) = mixed_backend()
        .failing("billing.events.status")
        .into_shared();

    let err = create_dictionary(&config, backend).await.unwrap_err();
    assert!(matches!(err, ScanError::ColumnScan { .. }));
    assert!(err.to_string().contains("billing.events.status"));
    assert!(!config.paths.output_path().exists());
}

#[tokio::test]
async fn test_failed_run_keeps_previous_dictionary() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &standard_rules());
    let config = config_in(&temp_dir, 2);
    std::fs::write(config.paths.output_path(), "previous").unwrap();

    let (backend, _stats) = mixed_backend().failing("public.accounts.memo").into_shared();
    assert_eq!(run(&config, backend).await, ResultCode::Fail);

    let contents = std::fs::read_to_string(config.paths.output_path()).unwrap();
    assert_eq!(contents, "previous");
}

#[tokio::test]
async fn test_no_columns_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &standard_rules());
    let config = config_in(&temp_dir, 2);
    let (backend, _stats) = MemoryBackend::new().into_shared();

    let err = create_dictionary(&config, backend.clone()).await.unwrap_err();
    assert!(matches!(err, ScanError::NoColumns));
    assert_eq!(err.to_string(), "no columns to scan");

    assert_eq!(run(&config, backend).await, ResultCode::Fail);
    assert!(!config.paths.output_path().exists());
}

#[tokio::test]
async fn test_missing_rules_fail_before_catalog_query() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_in(&temp_dir, 2);
    let (backend, stats) = users_backend().into_shared();

    let err = create_dictionary(&config, backend).await.unwrap_err();
    assert!(matches!(err, ScanError::Rules(_)));
    assert_eq!(stats.catalog_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_pattern_fails_before_catalog_query() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &json!({ "data_regex": ["(unclosed"] }));
    let config = config_in(&temp_dir, 2);
    let (backend, stats) = users_backend().into_shared();

    let err = create_dictionary(&config, backend).await.unwrap_err();
    assert!(matches!(err, ScanError::Rules(_)));
    assert_eq!(stats.catalog_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &standard_rules());
    let config = config_in(&temp_dir, 0);
    let (backend, stats) = users_backend().into_shared();

    let err = create_dictionary(&config, backend).await.unwrap_err();
    assert!(matches!(err, ScanError::Config(_)));
    assert_eq!(stats.catalog_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_successful_run_reports_done() {
    let temp_dir = TempDir::new().unwrap();
    write_rules(temp_dir.path(), &standard_rules());
    let config = config_in(&temp_dir, 2);
    let (backend, stats) = mixed_backend().into_shared();

    assert_eq!(run(&config, backend).await, ResultCode::Done);
    assert!(config.paths.output_path().exists());
    assert_eq!(
        stats.samplers_opened.load(Ordering::SeqCst),
        stats.samplers_closed.load(Ordering::SeqCst)
    );
}

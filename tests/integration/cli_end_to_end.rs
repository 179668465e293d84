//! End-to-end tests that drive the compiled binary

use assert_cmd::Command;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn cli() -> Command {
    Command::cargo_bin("erate-open-data").unwrap()
}

/// Start a mock server on a dedicated runtime that stays alive while the
/// child process talks to it
fn start_server(mounts: Vec<(&'static str, Value)>) -> (tokio::runtime::Runtime, MockServer) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        for (resource, body) in mounts {
            Mock::given(method("GET"))
                .and(path(format!("/resource/{resource}.json")))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;
        }
        server
    });
    (rt, server)
}

#[test]
fn test_datasets_list_shows_catalog() {
    let assert = cli().args(["datasets", "list"]).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    assert!(stdout.contains("form-471"));
    assert!(stdout.contains("srbr-2d59"));
    assert!(stdout.contains("form-472"));
    assert!(stdout.contains("c2-budget"));
}

#[test]
fn test_datasets_list_json_parses() {
    let assert = cli()
        .args(["datasets", "list", "--format", "json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    let entries: Value = serde_json::from_str(&stdout).unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 6);
    assert!(entries.iter().any(|e| e["alias"] == "form-471"));
}

#[test]
fn test_fetch_exports_csv_and_reports_envelope() {
    let (_rt, server) = start_server(vec![(
        "srbr-2d59",
        json!([
            {
                "application_number": "241000001",
                "funding_year": "2024",
                "organization_name": "SPRINGFIELD SD",
                "state": "IL",
                "form_471_frn_status_name": "Funded",
            },
            {
                "application_number": "241000002",
                "funding_year": "2024",
                "organization_name": "SHELBYVILLE SD",
                "state": "IL",
                "form_471_frn_status_name": "Denied",
            },
        ]),
    )]);

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.csv");

    let assert = cli()
        .args([
            "--base-url",
            &server.uri(),
            "--batch-size",
            "1000",
            "--output-format",
            "json",
            "--quiet",
            "fetch",
            "--dataset",
            "form-471",
            "--year",
            "2024",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let envelope: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(envelope["status"], "success");
    assert_eq!(envelope["count"], 2);
    assert_eq!(envelope["complete"], true);
    assert_eq!(envelope["data"].as_array().unwrap().len(), 2);

    let contents = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("funding_year,organization_name,state"));
    assert!(lines[1].contains("SPRINGFIELD SD"));
}

#[test]
fn test_fetch_honors_column_allow_list() {
    let (_rt, server) = start_server(vec![(
        "srbr-2d59",
        json!([
            {
                "funding_year": "2024",
                "state": "NY",
                "organization_name": "ALBANY CSD",
                "extra_field": "never exported",
            },
        ]),
    )]);

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("narrow.csv");

    cli()
        .args([
            "--base-url",
            &server.uri(),
            "--quiet",
            "fetch",
            "--columns",
            "state,funding_year",
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let contents = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "state,funding_year");
    assert_eq!(lines[1], "NY,2024");
}

#[test]
fn test_unknown_dataset_fails_with_error_envelope() {
    let assert = cli()
        .args(["--output-format", "json", "fetch", "--dataset", "form-999"])
        .assert()
        .failure();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let envelope: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(envelope["status"], "error");
    assert!(envelope["message"]
        .as_str()
        .unwrap()
        .contains("unknown dataset"));
}

#[test]
fn test_balance_rejects_non_numeric_ben() {
    cli()
        .args(["balance", "--ben", "12ab"])
        .assert()
        .failure();
}

#[test]
fn test_enrich_requires_a_work_list() {
    cli().args(["enrich"]).assert().failure();
}

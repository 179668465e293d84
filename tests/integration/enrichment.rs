//! End-to-end tests for the billed-entity enrichment flow

use erate_open_data::enrich::Enricher;
use erate_open_data::fetcher::SocrataClient;
use erate_open_data::resume::ProgressLedger;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESOURCE_PATH: &str = "/resource/srbr-2d59.json";

fn client_for(server: &MockServer) -> SocrataClient {
    SocrataClient::new(server.uri()).unwrap()
}

/// Mount the funding-request history returned for one entity
async fn mount_ben(server: &MockServer, ben: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .and(query_param("$where", format!("ben = '{ben}'")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_enrichment_writes_summary_rows_in_input_order() {
    let server = MockServer::start().await;
    mount_ben(
        &server,
        "143022",
        json!([
            {
                "ben": "143022",
                "organization_name": "SPRINGFIELD SD",
                "state": "IL",
                "funding_year": "2024",
                "funding_request_number": "2499000123",
                "form_471_frn_status_name": "Funded",
                "funding_commitment_request": "1500.50",
            },
            {
                "ben": "143022",
                "organization_name": "SPRINGFIELD SD",
                "state": "IL",
                "funding_year": "2023",
                "funding_request_number": "2399000456",
                "form_471_frn_status_name": "Denied",
                "funding_commitment_request": "900.00",
            },
        ]),
    )
    .await;
    mount_ben(&server, "999999", json!([])).await;

    let dir = TempDir::new().unwrap();
    let ledger_path = dir.path().join("progress.json");
    let output_path = dir.path().join("summaries.csv");

    let enricher = Enricher::new(client_for(&server), "srbr-2d59")
        .with_ledger_path(&ledger_path)
        .with_output_path(&output_path)
        .with_item_delay(Duration::ZERO);

    let items = vec!["143022".to_string(), "999999".to_string()];
    let report = enricher.run(&items, None).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.fetched, 2);
    assert_eq!(report.skipped, 0);

    // One row per entity, in input order, with the summary reductions
    let mut reader = csv::Reader::from_path(&output_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "ben");
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);

    let found = &rows[0];
    assert_eq!(found.get(headers.iter().position(|h| h == "ben").unwrap()), Some("143022"));
    assert_eq!(
        found.get(headers.iter().position(|h| h == "organization_name").unwrap()),
        Some("SPRINGFIELD SD")
    );
    assert_eq!(found.get(headers.iter().position(|h| h == "frn_count").unwrap()), Some("2"));
    assert_eq!(
        found.get(headers.iter().position(|h| h == "latest_status").unwrap()),
        Some("Funded")
    );
    // Only the funded request counts toward the committed total
    assert_eq!(
        found.get(headers.iter().position(|h| h == "total_committed").unwrap()),
        Some("1500.5")
    );
    assert_eq!(found.get(headers.iter().position(|h| h == "found").unwrap()), Some("true"));

    let missing = &rows[1];
    assert_eq!(missing.get(headers.iter().position(|h| h == "ben").unwrap()), Some("999999"));
    assert_eq!(missing.get(headers.iter().position(|h| h == "found").unwrap()), Some("false"));
    assert_eq!(missing.get(headers.iter().position(|h| h == "frn_count").unwrap()), Some("0"));

    // The finished run cleans up its ledger
    assert!(!ledger_path.exists());
}

/// A ledger that already covers every entity means the run touches the
/// network zero times and still writes the CSV
#[tokio::test]
async fn test_fully_checkpointed_run_makes_no_requests() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 and abort the run

    let dir = TempDir::new().unwrap();
    let ledger_path = dir.path().join("progress.json");
    let output_path = dir.path().join("summaries.csv");

    let mut seeded = ProgressLedger::new();
    for ben in ["100001", "100002"] {
        let record = match json!({
            "ben": ben,
            "organization_name": "SEEDED",
            "state": "TX",
            "frn_count": 1,
            "found": true,
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        seeded.record(ben, record);
    }
    seeded.save(&ledger_path).unwrap();

    let enricher = Enricher::new(client_for(&server), "srbr-2d59")
        .with_ledger_path(&ledger_path)
        .with_output_path(&output_path)
        .with_item_delay(Duration::ZERO);

    let items = vec!["100001".to_string(), "100002".to_string()];
    let report = enricher.run(&items, None).await.unwrap();

    assert_eq!(report.fetched, 0);
    assert_eq!(report.skipped, 2);
    assert!(server.received_requests().await.unwrap().is_empty());

    let contents = std::fs::read_to_string(&output_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("100001"));
    assert!(lines[2].contains("100002"));
}

/// An entity whose fetch fails terminally leaves the ledger behind for
/// the next attempt and writes no CSV
#[tokio::test]
async fn test_failed_entity_preserves_ledger() {
    let server = MockServer::start().await;
    mount_ben(&server, "100001", json!([{"ben": "100001", "funding_year": "2024"}])).await;
    Mock::given(method("GET"))
        .and(path(RESOURCE_PATH))
        .and(query_param("$where", "ben = '100002'"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let ledger_path = dir.path().join("progress.json");
    let output_path = dir.path().join("summaries.csv");

    let enricher = Enricher::new(client_for(&server), "srbr-2d59")
        .with_ledger_path(&ledger_path)
        .with_output_path(&output_path)
        .with_checkpoint_interval(1)
        .with_item_delay(Duration::ZERO);

    let items = vec!["100001".to_string(), "100002".to_string()];
    let result = enricher.run(&items, None).await;

    assert!(result.is_err());
    assert!(!output_path.exists());
    // The first entity's checkpoint survives for the retry
    assert_eq!(ProgressLedger::load(&ledger_path).completed_count(), 1);
    assert!(ProgressLedger::load(&ledger_path).is_completed("100001"));
}

//! `NotionClient` against a mock Notion API.

use ledger_relay::config::NotionConfig;
use ledger_relay::models::{ColumnType, Properties, PropertyValue};
use ledger_relay::notion::NotionClient;
use ledger_relay::store::DocumentStore;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> NotionClient {
    let cfg = NotionConfig {
        api_base: server.uri(),
        ..NotionConfig::default()
    };
    NotionClient::new(&cfg, "secret_test").unwrap()
}

#[tokio::test]
async fn test_retrieve_database_sends_auth_and_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/databases/db-1"))
        .and(header("authorization", "Bearer secret_test"))
        .and(header("notion-version", "2022-06-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "database",
            "id": "db-1",
            "title": [{ "plain_text": "가계부" }],
            "properties": {
                "항목": { "type": "title", "title": {} },
                "날짜": { "type": "date", "date": {} },
                "종류": {
                    "type": "select",
                    "select": { "options": [{ "name": "지출" }, { "name": "수입" }] }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let meta = client(&server).retrieve_database("db-1").await.unwrap();
    assert_eq!(meta.title, "가계부");
    let names: Vec<&str> = meta.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["날짜", "종류", "항목"]);
    assert_eq!(meta.columns[1].column_type, ColumnType::Select);
    assert_eq!(meta.columns[1].options, ["지출", "수입"]);
}

#[tokio::test]
async fn test_api_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/databases/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "object": "error",
            "code": "object_not_found",
            "message": "Could not find database"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .retrieve_database("missing")
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("HTTP 404"), "error was: {}", err);
    assert!(err.contains("object_not_found"), "error was: {}", err);
}

#[tokio::test]
async fn test_create_page_encodes_properties() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .and(body_partial_json(json!({
            "parent": { "database_id": "db-1" },
            "properties": {
                "항목": { "title": [{ "text": { "content": "커피" } }] },
                "지출 금액": { "number": 4500 },
                "종류": { "select": { "name": "지출" } },
                "날짜": { "date": { "start": "2026-01-09T00:00:00" } }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "page",
            "id": "page-42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut props = Properties::new();
    props.insert("항목".into(), PropertyValue::Title("커피".into()));
    props.insert("지출 금액".into(), PropertyValue::Number(4500));
    props.insert("종류".into(), PropertyValue::Select("지출".into()));
    props.insert(
        "날짜".into(),
        PropertyValue::Date("2026-01-09T00:00:00".into()),
    );

    let id = client(&server).create_page("db-1", &props).await.unwrap();
    assert_eq!(id, "page-42");
}

#[tokio::test]
async fn test_query_follows_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(body_partial_json(json!({ "start_cursor": "c2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "id": "p3", "properties": {} }],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(body_partial_json(json!({
            "sorts": [{ "property": "날짜", "direction": "descending" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": "p1", "properties": {} },
                { "id": "p2", "properties": {} }
            ],
            "has_more": true,
            "next_cursor": "c2"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let pages = client(&server)
        .query_database("db-1", Some("날짜"), 10)
        .await
        .unwrap();
    let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p1", "p2", "p3"]);
}

#[tokio::test]
async fn test_search_databases() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .and(body_partial_json(json!({
            "filter": { "property": "object", "value": "database" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "id": "db-1",
                    "title": [{ "plain_text": "가계부" }],
                    "url": "https://www.notion.so/db1"
                },
                { "id": "db-2", "title": [] }
            ]
        })))
        .mount(&server)
        .await;

    let dbs = client(&server).search_databases().await.unwrap();
    assert_eq!(dbs.len(), 2);
    assert_eq!(dbs[0].title, "가계부");
    assert_eq!(dbs[0].url.as_deref(), Some("https://www.notion.so/db1"));
    assert_eq!(dbs[1].title, "");
}

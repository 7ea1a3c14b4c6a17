//! Notion REST client.
//!
//! Implements [`DocumentStore`] against the public Notion API using plain
//! `reqwest` calls:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | retrieve database | `GET /v1/databases/{id}` |
//! | create page | `POST /v1/pages` |
//! | query database | `POST /v1/databases/{id}/query` (cursor pagination) |
//! | search databases | `POST /v1/search` |
//!
//! Every request carries `Authorization: Bearer <NOTION_API_KEY>` and the
//! configured `Notion-Version`. Non-2xx responses become errors carrying
//! the status and the first 500 characters of the body. Nothing is retried.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::NotionConfig;
use crate::models::{
    ColumnDef, ColumnType, DatabaseMeta, DatabaseSummary, PageSummary, Properties, PropertyValue,
};
use crate::store::DocumentStore;

/// Largest `page_size` the API accepts.
const MAX_PAGE_SIZE: usize = 100;

pub struct NotionClient {
    http: reqwest::Client,
    api_base: String,
    api_version: String,
    api_key: String,
}

impl NotionClient {
    pub fn new(config: &NotionConfig, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            api_key: api_key.to_string(),
        })
    }

    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.api_base, path);
        debug!(%method, %url, "notion request");

        let mut req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", &self.api_version);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("Notion request {} {} failed", method, path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "Notion API error (HTTP {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        resp.json()
            .await
            .with_context(|| format!("Notion response for {} was not JSON", path))
    }
}

#[async_trait]
impl DocumentStore for NotionClient {
    async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseMeta> {
        let json = self
            .call(Method::GET, &format!("/v1/databases/{}", database_id), None)
            .await?;
        parse_database(&json)
    }

    async fn create_page(&self, database_id: &str, properties: &Properties) -> Result<String> {
        let body = json!({
            "parent": { "database_id": database_id },
            "properties": encode_properties(properties),
        });
        let json = self.call(Method::POST, "/v1/pages", Some(&body)).await?;
        json.get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Invalid Notion response: created page has no id"))
    }

    async fn query_database(
        &self,
        database_id: &str,
        sort_property: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PageSummary>> {
        let path = format!("/v1/databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        while pages.len() < limit {
            let mut body = json!({ "page_size": (limit - pages.len()).min(MAX_PAGE_SIZE) });
            if let Some(prop) = sort_property {
                body["sorts"] = json!([{ "property": prop, "direction": "descending" }]);
            }
            if let Some(ref c) = cursor {
                body["start_cursor"] = json!(c);
            }

            let json = self.call(Method::POST, &path, Some(&body)).await?;
            let (batch, next) = parse_page_list(&json)?;
            pages.extend(batch);

            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        pages.truncate(limit);
        Ok(pages)
    }

    async fn search_databases(&self) -> Result<Vec<DatabaseSummary>> {
        let body = json!({ "filter": { "property": "object", "value": "database" } });
        let json = self.call(Method::POST, "/v1/search", Some(&body)).await?;
        let results = json
            .get("results")
            .and_then(|r| r.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid Notion response: missing results array"))?;

        Ok(results
            .iter()
            .filter_map(|db| {
                Some(DatabaseSummary {
                    id: db.get("id")?.as_str()?.to_string(),
                    title: plain_text(db.get("title")),
                    url: db.get("url").and_then(|u| u.as_str()).map(str::to_string),
                })
            })
            .collect())
    }
}

/// Parse a `GET /v1/databases/{id}` response.
///
/// Columns come out sorted by name.
pub fn parse_database(json: &Value) -> Result<DatabaseMeta> {
    let id = json
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid Notion response: database has no id"))?;
    let props = json
        .get("properties")
        .and_then(|p| p.as_object())
        .ok_or_else(|| anyhow::anyhow!("Invalid Notion response: missing properties object"))?;

    let mut columns: Vec<ColumnDef> = props
        .iter()
        .map(|(name, prop)| parse_column(name, prop))
        .collect::<Result<_>>()?;
    columns.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(DatabaseMeta {
        id: id.to_string(),
        title: plain_text(json.get("title")),
        columns,
        raw_properties: Value::Object(props.clone()),
    })
}

fn parse_column(name: &str, prop: &Value) -> Result<ColumnDef> {
    let kind = prop
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid Notion response: property '{}' has no type", name)
        })?;
    let column_type = ColumnType::from_api(kind);

    let mut column = ColumnDef::new(name, column_type.clone());
    match column_type {
        ColumnType::Select | ColumnType::MultiSelect => {
            column.options = prop
                .get(kind)
                .and_then(|s| s.get("options"))
                .and_then(|o| o.as_array())
                .map(|opts| {
                    opts.iter()
                        .filter_map(|o| o.get("name").and_then(|n| n.as_str()))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
        }
        ColumnType::Relation => {
            column.relation_target = prop
                .get("relation")
                .and_then(|r| r.get("database_id"))
                .and_then(|d| d.as_str())
                .map(str::to_string);
        }
        _ => {}
    }
    Ok(column)
}

/// Parse a query response into pages and the next cursor, if any.
fn parse_page_list(json: &Value) -> Result<(Vec<PageSummary>, Option<String>)> {
    let results = json
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Notion response: missing results array"))?;

    let pages = results
        .iter()
        .filter_map(|page| {
            Some(PageSummary {
                id: page.get("id")?.as_str()?.to_string(),
                properties: page.get("properties").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    let has_more = json
        .get("has_more")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let next = if has_more {
        json.get("next_cursor")
            .and_then(|c| c.as_str())
            .map(str::to_string)
    } else {
        None
    };
    Ok((pages, next))
}

/// Concatenated `plain_text` of a rich-text array.
fn plain_text(segments: Option<&Value>) -> String {
    segments
        .and_then(|s| s.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|seg| seg.get("plain_text").and_then(|t| t.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Encode typed values in the page-create `properties` shape.
pub fn encode_properties(props: &Properties) -> Value {
    let map = props
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
}

fn encode_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Title(text) => json!({ "title": [{ "text": { "content": text } }] }),
        PropertyValue::RichText(text) => {
            json!({ "rich_text": [{ "text": { "content": text } }] })
        }
        PropertyValue::Date(start) => json!({ "date": { "start": start } }),
        PropertyValue::Number(n) => json!({ "number": n }),
        PropertyValue::Select(label) => json!({ "select": { "name": label } }),
        PropertyValue::Relation(ids) => {
            json!({ "relation": ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database_json() -> Value {
        json!({
            "object": "database",
            "id": "db-1",
            "title": [{ "plain_text": "가계부 " }, { "plain_text": "2026" }],
            "properties": {
                "항목": { "id": "title", "type": "title", "title": {} },
                "날짜": { "id": "a", "type": "date", "date": {} },
                "지출 금액": { "id": "b", "type": "number", "number": { "format": "won" } },
                "종류": {
                    "id": "c",
                    "type": "select",
                    "select": { "options": [{ "name": "지출" }, { "name": "수입" }] }
                },
                "월": { "id": "d", "type": "relation", "relation": { "database_id": "m-1" } },
                "합계": { "id": "e", "type": "formula", "formula": { "expression": "x" } }
            }
        })
    }

    #[test]
    fn test_parse_database_columns() {
        let meta = parse_database(&database_json()).unwrap();
        assert_eq!(meta.id, "db-1");
        assert_eq!(meta.title, "가계부 2026");
        assert_eq!(meta.columns.len(), 6);

        let kind = meta.columns.iter().find(|c| c.name == "종류").unwrap();
        assert_eq!(kind.column_type, ColumnType::Select);
        assert_eq!(kind.options, ["지출", "수입"]);

        let month = meta.columns.iter().find(|c| c.name == "월").unwrap();
        assert_eq!(month.relation_target.as_deref(), Some("m-1"));

        let formula = meta.columns.iter().find(|c| c.name == "합계").unwrap();
        assert_eq!(formula.column_type, ColumnType::Other("formula".to_string()));
    }

    #[test]
    fn test_parse_database_rejects_missing_properties() {
        let err = parse_database(&json!({ "id": "x" })).unwrap_err();
        assert!(err.to_string().contains("properties"));
    }

    #[test]
    fn test_encode_properties_shapes() {
        let mut props = Properties::new();
        props.insert("항목".into(), PropertyValue::Title("커피".into()));
        props.insert("날짜".into(), PropertyValue::Date("2026-01-09T00:00:00".into()));
        props.insert("지출 금액".into(), PropertyValue::Number(4500));
        props.insert("종류".into(), PropertyValue::Select("지출".into()));
        props.insert("월".into(), PropertyValue::Relation(vec!["p-1".into()]));

        let v = encode_properties(&props);
        assert_eq!(v["항목"]["title"][0]["text"]["content"], "커피");
        assert_eq!(v["날짜"]["date"]["start"], "2026-01-09T00:00:00");
        assert_eq!(v["지출 금액"]["number"], 4500);
        assert_eq!(v["종류"]["select"]["name"], "지출");
        assert_eq!(v["월"]["relation"][0]["id"], "p-1");
    }

    #[test]
    fn test_parse_page_list_cursor() {
        let json = json!({
            "results": [{ "id": "p1", "properties": {} }],
            "has_more": true,
            "next_cursor": "c2"
        });
        let (pages, next) = parse_page_list(&json).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(next.as_deref(), Some("c2"));

        let json = json!({ "results": [], "has_more": false, "next_cursor": null });
        let (_, next) = parse_page_list(&json).unwrap();
        assert!(next.is_none());
    }
}

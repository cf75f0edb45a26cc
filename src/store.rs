use std::time::Duration;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use crate::error::{AppError, Result};

const TABLE: &str = "summaries";
const STORE_TIMEOUT: Duration = Duration::from_secs(15);

/// Primary key as the database hands it out: uuid text or an identity number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(i64),
}

/// A row of the `summaries` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: RecordId,
    pub original_text: String,
    pub summary: String,
    pub user_id: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The projection returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryListItem {
    pub id: RecordId,
    pub summary: String,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct NewSummary<'a> {
    pub original_text: &'a str,
    pub summary: &'a str,
    pub user_id: &'a str,
    pub url: Option<&'a str>,
}

#[derive(Debug)]
pub struct SummaryPage {
    pub items: Vec<SummaryListItem>,
    pub total: u64,
}

/// Thin client over the PostgREST interface of the hosted database.
pub struct SummaryStore {
    http: Client,
    table_url: String,
    api_key: String,
}

impl SummaryStore {
    pub fn new(base_url: &str, api_key: String) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(STORE_TIMEOUT).build()?;
        Ok(Self {
            http,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), TABLE),
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method) -> RequestBuilder {
        self.http
            .request(method, &self.table_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    pub async fn insert(&self, row: &NewSummary<'_>) -> Result<()> {
        let res = self
            .request(reqwest::Method::POST)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(persistence)?;

        ensure_success(res).await?;
        Ok(())
    }

    /// Newest first, `limit` rows starting at `skip`, with the user's total.
    pub async fn list(&self, user_id: &str, skip: u64, limit: u64) -> Result<SummaryPage> {
        if limit == 0 {
            return Err(AppError::InvalidInput("limit must be at least 1".to_string()));
        }

        let user_filter = format!("eq.{}", user_id);
        let res = self
            .request(reqwest::Method::GET)
            .query(&[
                ("select", "id,summary,url,created_at"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .header("Range-Unit", "items")
            .header(header::RANGE, format!("{}-{}", skip, skip.saturating_add(limit - 1)))
            .header("Prefer", "count=exact")
            .send()
            .await
            .map_err(persistence)?;

        let total = res
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total);

        // PostgREST answers 416 when the window starts past the last row.
        if res.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(SummaryPage { items: Vec::new(), total: total.unwrap_or(0) });
        }

        let items: Vec<SummaryListItem> = ensure_success(res)
            .await?
            .json()
            .await
            .map_err(persistence)?;

        let total = total.unwrap_or(items.len() as u64);
        Ok(SummaryPage { items, total })
    }

    pub async fn get(&self, id: &str) -> Result<SummaryRecord> {
        let id_filter = format!("eq.{}", id);
        let res = self
            .request(reqwest::Method::GET)
            .query(&[("select", "*"), ("id", id_filter.as_str())])
            .send()
            .await
            .map_err(persistence)?;

        let rows: Vec<SummaryRecord> = ensure_success(res)
            .await?
            .json()
            .await
            .map_err(persistence)?;

        rows.into_iter().next().ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id_filter = format!("eq.{}", id);
        let res = self
            .request(reqwest::Method::DELETE)
            .query(&[("id", id_filter.as_str())])
            .header("Prefer", "return=representation")
            .send()
            .await
            .map_err(persistence)?;

        let deleted: Vec<serde_json::Value> = ensure_success(res)
            .await?
            .json()
            .await
            .map_err(persistence)?;

        if deleted.is_empty() {
            return Err(not_found(id));
        }
        Ok(())
    }
}

async fn ensure_success(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    // An id that is not a valid key (e.g. not a uuid) cannot match any row.
    if status == StatusCode::BAD_REQUEST && body.contains("22P02") {
        return Err(AppError::NotFoundError("Summary not found".to_string()));
    }
    Err(AppError::PersistenceError(format!("{}: {}", status, body)))
}

fn persistence(err: reqwest::Error) -> AppError {
    AppError::PersistenceError(err.to_string())
}

fn not_found(id: &str) -> AppError {
    AppError::NotFoundError(format!("Summary {} not found", id))
}

/// Reads the total from a `Content-Range` value such as `0-9/42` or `*/0`.
fn parse_total(content_range: &str) -> Option<u64> {
    content_range.rsplit_once('/')?.1.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_comes_from_content_range() {
        assert_eq!(parse_total("0-9/42"), Some(42));
        assert_eq!(parse_total("*/0"), Some(0));
        assert_eq!(parse_total("0-9/*"), None);
        assert_eq!(parse_total("garbage"), None);
    }

    #[test]
    fn table_url_is_built_from_base() {
        let store = SummaryStore::new("https://abc.supabase.co/", "key".into()).unwrap();
        assert_eq!(store.table_url, "https://abc.supabase.co/rest/v1/summaries");
    }

    #[test]
    fn list_rows_tolerate_missing_url() {
        let row: SummaryListItem = serde_json::from_str(
            r#"{"id":"a1","summary":"s","url":null,"created_at":"2025-05-03T10:00:00+00:00"}"#,
        )
        .unwrap();
        assert!(row.url.is_none());
        assert_eq!(row.id, RecordId::Text("a1".into()));
    }

    #[test]
    fn numeric_ids_round_trip_as_numbers() {
        let row: SummaryListItem = serde_json::from_str(
            r#"{"id":7,"summary":"s","url":"https://example.com","created_at":"2025-05-03T10:00:00.123456+00:00"}"#,
        )
        .unwrap();
        assert_eq!(row.id, RecordId::Number(7));
        assert_eq!(serde_json::to_value(&row).unwrap()["id"], 7);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_before_any_request() {
        let store = SummaryStore::new("http://127.0.0.1:9", "key".into()).unwrap();
        let err = store.list("user-1", 0, 0).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}

use super::types::*;
use super::AdminStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::json;

const ITEMS: &str = "items";
const SOURCES: &str = "sources";

/// PostgREST client for a hosted Supabase project.
pub struct SupabaseRest {
    client: Client,
    api_key: String,
    base_url: String,
    schema: Option<String>,
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
pub fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/').and_then(|(_, total)| total.trim().parse().ok())
}

/// `in.(A,B,C)` filter value.
fn in_list(statuses: &[ItemStatus]) -> String {
    let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    format!("in.({})", names.join(","))
}

impl SupabaseRest {
    pub fn new(project_url: &str, api_key: String, schema: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            schema,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, table);
        let profile_header = if method == Method::GET || method == Method::HEAD {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        let mut req = self
            .client
            .request(method, &url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key);
        if let Some(schema) = &self.schema {
            req = req.header(profile_header, schema);
        }
        req
    }

    async fn send(req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = req.send().await.with_context(|| format!("{} request failed", what))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("{} failed ({}): {}", what, status, body);
        }
        Ok(resp)
    }

    /// Exact row count for `table` under the given filters.
    async fn count(&self, table: &str, filters: &[(&str, &str)]) -> Result<u64> {
        let req = self
            .request(Method::GET, table)
            .header("Prefer", "count=exact")
            .query(&[("select", "id"), ("limit", "1")])
            .query(filters);
        let what = format!("count {}", table);
        let resp = Self::send(req, &what).await?;
        let range = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        range
            .as_deref()
            .and_then(parse_content_range)
            .with_context(|| format!("{}: missing or malformed Content-Range ({:?})", what, range))
    }

    /// Pre-flight check: verify the project URL and key before starting the TUI.
    pub async fn ping(&self) -> Result<()> {
        let resp = self
            .request(Method::GET, SOURCES)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .context("Data store pre-flight request failed")?;
        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Data store rejected the key ({}).\n\
                 Check SUPABASE_KEY in .env or the environment.\n\
                 Server response: {}",
                status,
                body
            );
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Data store pre-flight failed ({}): {}", status, body);
        }
        Ok(())
    }

    async fn patch_row(&self, table: &str, id: &RowId, body: serde_json::Value, what: &str) -> Result<()> {
        let filter = format!("eq.{}", id);
        let req = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=minimal")
            .query(&[("id", filter.as_str())])
            .json(&body);
        Self::send(req, what).await?;
        Ok(())
    }

    async fn delete_row(&self, table: &str, id: &RowId, what: &str) -> Result<()> {
        let filter = format!("eq.{}", id);
        let req = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=minimal")
            .query(&[("id", filter.as_str())]);
        Self::send(req, what).await?;
        Ok(())
    }
}

#[async_trait]
impl AdminStore for SupabaseRest {
    async fn list_sources(&self) -> Result<Vec<Source>> {
        let req = self
            .request(Method::GET, SOURCES)
            .query(&[("select", "*"), ("order", "name.asc")]);
        let resp = Self::send(req, "GET sources").await?;
        resp.json().await.context("failed to parse sources response")
    }

    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<Item>> {
        let limit = query.limit.to_string();
        let mut params: Vec<(&str, String)> = vec![
            ("select", "*,sources(name)".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit),
        ];
        if !query.statuses.is_empty() {
            params.push(("status", in_list(&query.statuses)));
        }
        if let Some(source_id) = &query.source_id {
            params.push(("source_id", format!("eq.{}", source_id)));
        }
        let req = self.request(Method::GET, ITEMS).query(&params);
        let resp = Self::send(req, "GET items").await?;
        resp.json().await.context("failed to parse items response")
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let (published, failed, pending, active_sources) = tokio::try_join!(
            self.count(ITEMS, &[("status", "eq.PUBLISHED")]),
            self.count(ITEMS, &[("status", "ilike.*FAILED*")]),
            self.count(ITEMS, &[("status", "eq.PENDING")]),
            self.count(SOURCES, &[("is_active", "eq.true")]),
        )?;
        Ok(DashboardStats { published, failed, pending, active_sources })
    }

    async fn recent_activity(&self, limit: u32) -> Result<Vec<ActivityPoint>> {
        let limit = limit.to_string();
        let req = self.request(Method::GET, ITEMS).query(&[
            ("select", "status,created_at"),
            ("order", "created_at.desc"),
            ("limit", limit.as_str()),
        ]);
        let resp = Self::send(req, "GET recent activity").await?;
        resp.json().await.context("failed to parse activity response")
    }

    async fn retry_item(&self, id: &RowId) -> Result<()> {
        let body = json!({
            "status": ItemStatus::Pending,
            "error_message": null,
            "retry_count": 0,
        });
        self.patch_row(ITEMS, id, body, "retry item").await
    }

    async fn delete_item(&self, id: &RowId) -> Result<()> {
        self.delete_row(ITEMS, id, "delete item").await
    }

    async fn add_source(&self, source: &NewSource) -> Result<()> {
        let req = self
            .request(Method::POST, SOURCES)
            .header("Prefer", "return=minimal")
            .json(source);
        Self::send(req, "insert source").await?;
        Ok(())
    }

    async fn set_source_active(&self, id: &RowId, active: bool) -> Result<()> {
        self.patch_row(SOURCES, id, json!({ "is_active": active }), "update source").await
    }

    async fn delete_source(&self, id: &RowId) -> Result<()> {
        self.delete_row(SOURCES, id, "delete source").await
    }

    async fn mark_source_checked(&self, id: &RowId, at: DateTime<Utc>) -> Result<()> {
        let body = json!({ "last_checked_at": at.to_rfc3339() });
        self.patch_row(SOURCES, id, body, "mark source checked").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range("0-0/42"), Some(42));
        assert_eq!(parse_content_range("*/0"), Some(0));
        assert_eq!(parse_content_range("0-24/*"), None);
        assert_eq!(parse_content_range("garbage"), None);
    }

    #[test]
    fn test_in_list_filter() {
        assert_eq!(
            in_list(&[ItemStatus::Pending, ItemStatus::FailedWp]),
            "in.(PENDING,FAILED_WP)"
        );
    }

    #[test]
    fn test_base_url_normalised() {
        let rest = SupabaseRest::new("https://x.supabase.co/", "k".into(), None).unwrap();
        assert_eq!(rest.base_url, "https://x.supabase.co/rest/v1");
    }
}

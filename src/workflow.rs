use anyhow::{Context, Result};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::{Client, Method};
use serde::Serialize;
use std::time::Duration;

use crate::config::{WorkflowConfig, WorkflowCredentials};
use crate::store::types::RowId;

const BODY_EXCERPT_CHARS: usize = 200;

/// Payload sent to the workflow engine's webhook.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerRequest {
    pub trigger: &'static str,
    pub run_id: String,
    pub requested_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<RowId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_slug: Option<String>,
}

impl TriggerRequest {
    /// A manual run, optionally scoped to one source.
    pub fn manual(source_id: Option<RowId>, city_slug: Option<String>) -> Self {
        Self {
            trigger: "manual",
            run_id: new_run_id(),
            requested_at: Utc::now(),
            source_id,
            city_slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub run_id: String,
    pub status: u16,
    pub body_excerpt: String,
}

/// Random 16-hex-digit correlation id for a triggered run.
pub fn new_run_id() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

/// Starts a crawl/rewrite/publish run on the external workflow engine.
pub struct WorkflowClient {
    client: Client,
    url: String,
    method: Method,
    credentials: WorkflowCredentials,
}

impl WorkflowClient {
    pub fn new(config: &WorkflowConfig, credentials: WorkflowCredentials) -> Result<Self> {
        let method = Method::from_bytes(config.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid workflow method: {}", config.method))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build workflow HTTP client")?;
        Ok(Self {
            client,
            url: config.url.clone(),
            method,
            credentials,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn trigger(&self, request: &TriggerRequest) -> Result<TriggerOutcome> {
        let mut req = self.client.request(self.method.clone(), &self.url);
        req = if self.method == Method::GET {
            req.query(request)
        } else {
            req.json(request)
        };
        req = match &self.credentials {
            WorkflowCredentials::None => req,
            WorkflowCredentials::Bearer(token) => req.bearer_auth(token),
            WorkflowCredentials::Basic { username, password } => {
                req.header("Authorization", basic_auth_header(username, password))
            }
        };

        let resp = req.send().await.context("workflow trigger request failed")?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("workflow trigger failed ({}): {}", status, excerpt(&body));
        }
        Ok(TriggerOutcome {
            run_id: request.run_id.clone(),
            status: status.as_u16(),
            body_excerpt: excerpt(&body),
        })
    }
}

fn basic_auth_header(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
    format!("Basic {}", encoded)
}

fn excerpt(body: &str) -> String {
    let flat: String = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= BODY_EXCERPT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_shape() {
        let id = new_run_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(basic_auth_header("ops", "secret"), "Basic b3BzOnNlY3JldA==");
    }

    #[test]
    fn test_excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("{\n  \"ok\": true\n}"), "{ \"ok\": true }");
        let long = "x".repeat(500);
        let e = excerpt(&long);
        assert!(e.ends_with("..."));
        assert_eq!(e.chars().count(), BODY_EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_request_omits_empty_scope() {
        let req = TriggerRequest::manual(None, None);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["trigger"], "manual");
        assert!(v.get("source_id").is_none());
        let scoped = TriggerRequest::manual(Some(RowId::int(3)), Some("krakow".into()));
        let v = serde_json::to_value(&scoped).unwrap();
        assert_eq!(v["source_id"], 3);
        assert_eq!(v["city_slug"], "krakow");
        // text keys that look numeric go out unchanged
        let text_key = TriggerRequest::manual(Some(RowId::new("007")), None);
        assert_eq!(serde_json::to_value(&text_key).unwrap()["source_id"], "007");
    }

    #[test]
    fn test_invalid_method_rejected() {
        let config = WorkflowConfig {
            url: "http://localhost/x".into(),
            method: "NOT A METHOD".into(),
            username: None,
            timeout_ms: 1000,
        };
        assert!(WorkflowClient::new(&config, WorkflowCredentials::None).is_err());
    }
}

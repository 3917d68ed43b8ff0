use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{self, Write};
use std::path::Path;

use crate::store::types::ItemStatus;

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub supabase: Option<SupabaseConfig>,
    #[serde(default)]
    pub queue: QueueConfig,
    pub workflow: Option<WorkflowConfig>,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    /// Postgres schema exposed by PostgREST. Sent as Accept-Profile/Content-Profile.
    pub schema: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_statuses", deserialize_with = "de_known_statuses")]
    pub default_statuses: Vec<ItemStatus>,
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: u32,
}

fn default_page_size() -> u32 { 50 }

/// Status names must match the stored values exactly; a typo is a config error.
fn de_known_statuses<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<ItemStatus>, D::Error> {
    let names: Vec<String> = Vec::deserialize(deserializer)?;
    names
        .iter()
        .map(|name| {
            ItemStatus::from_name(name).ok_or_else(|| {
                let known: Vec<&str> = ItemStatus::ALL.iter().map(|s| s.as_str()).collect();
                serde::de::Error::custom(format!(
                    "unknown status {:?} in [queue] default_statuses (expected one of {})",
                    name,
                    known.join(", ")
                ))
            })
        })
        .collect()
}
fn default_recent_activity_limit() -> u32 { 200 }
fn default_statuses() -> Vec<ItemStatus> {
    vec![ItemStatus::Pending, ItemStatus::FailedWp, ItemStatus::FailedAi]
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_statuses: default_statuses(),
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// When set, HTTP Basic auth is used with `WORKFLOW_PASSWORD`.
    pub username: Option<String>,
    #[serde(default = "default_workflow_timeout")]
    pub timeout_ms: u64,
}

fn default_method() -> String { "POST".to_string() }
fn default_workflow_timeout() -> u64 { 15_000 }

#[derive(Debug, Deserialize, Clone)]
pub struct FeedsConfig {
    #[serde(default = "default_feed_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_feed_timeout() -> u64 { 10_000 }
fn default_user_agent() -> String {
    format!("news-admin/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_feed_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 { 250 }

impl Default for UiConfig {
    fn default() -> Self {
        Self { tick_ms: default_tick_ms() }
    }
}

/// Credentials attached to the workflow trigger request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowCredentials {
    None,
    Bearer(String),
    Basic { username: String, password: String },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Demo mode runs without a config file.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        for (key, value) in parse_env(&content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    /// Service key for the data store: env var, .env, or prompted at startup.
    /// Prompted values are saved to .env for future runs.
    pub fn supabase_key() -> Result<String> {
        match std::env::var("SUPABASE_KEY") {
            Ok(key) if !key.is_empty() => Ok(sanitize_key(&key)),
            _ => {
                let key = prompt("Supabase service key")?;
                save_env_var("SUPABASE_KEY", &key);
                Ok(key)
            }
        }
    }

    /// Dashboard password. Never prompted for or persisted.
    pub fn app_password() -> Option<String> {
        std::env::var("APP_PASSWORD")
            .ok()
            .map(|p| sanitize_key(&p))
            .filter(|p| !p.is_empty())
    }

    pub fn workflow_credentials(&self) -> WorkflowCredentials {
        let env = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| sanitize_key(&v))
                .filter(|v| !v.is_empty())
        };
        let username = self.workflow.as_ref().and_then(|w| w.username.clone());
        resolve_workflow_credentials(username, env("WORKFLOW_TOKEN"), env("WORKFLOW_PASSWORD"))
    }
}

/// Basic auth needs both a configured username and `WORKFLOW_PASSWORD`;
/// otherwise `WORKFLOW_TOKEN` is sent as a bearer token.
fn resolve_workflow_credentials(
    username: Option<String>,
    token: Option<String>,
    password: Option<String>,
) -> WorkflowCredentials {
    match (username, password, token) {
        (Some(username), Some(password), _) => WorkflowCredentials::Basic { username, password },
        (_, _, Some(token)) => WorkflowCredentials::Bearer(token),
        _ => WorkflowCredentials::None,
    }
}

/// Parse KEY=VALUE lines, skipping blanks and comments.
fn parse_env(content: &str) -> Vec<(String, String)> {
    // Strip BOM if present (common on Windows-created files)
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

fn prompt(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = input.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", label);
    }
    Ok(value)
}

/// Strip carriage returns, BOM, and other invisible chars from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

/// Append a KEY=VALUE line to .env and set it in the current process.
fn save_env_var(key: &str, value: &str) {
    std::env::set_var(key, value);
    let path = Path::new(ENV_FILE);
    let mut contents = std::fs::read_to_string(path).unwrap_or_default();
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!("{}={}\n", key, value));
    if let Err(e) = std::fs::write(path, contents) {
        tracing::warn!(error = %e, "failed to persist {} to .env", key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parses() {
        let config = Config::parse(
            r#"
            [supabase]
            url = "https://abc.supabase.co"

            [queue]
            page_size = 25
            default_statuses = ["PENDING", "ERROR"]

            [workflow]
            url = "https://n8n.local/webhook/run"
            username = "ops"
            "#,
        )
        .unwrap();
        assert_eq!(config.supabase.unwrap().url, "https://abc.supabase.co");
        assert_eq!(config.queue.page_size, 25);
        assert_eq!(config.queue.default_statuses, vec![ItemStatus::Pending, ItemStatus::Error]);
        assert_eq!(config.queue.recent_activity_limit, 200);
        let wf = config.workflow.unwrap();
        assert_eq!(wf.method, "POST");
        assert_eq!(wf.timeout_ms, 15_000);
        assert_eq!(config.ui.tick_ms, 250);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.supabase.is_none());
        assert!(config.workflow.is_none());
        assert_eq!(config.queue.page_size, 50);
        assert_eq!(
            config.queue.default_statuses,
            vec![ItemStatus::Pending, ItemStatus::FailedWp, ItemStatus::FailedAi]
        );
        assert_eq!(config.feeds.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_parse_env_handles_quotes_comments_and_bom() {
        let parsed = parse_env("\u{feff}# comment\nA=1\r\n\nB = \"two\"\nC='3'\nnot a pair\n");
        assert_eq!(
            parsed,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two".to_string()),
                ("C".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_sanitize_key_strips_invisible_chars() {
        assert_eq!(sanitize_key("\u{feff} key\u{200b}\r "), "key");
    }

    #[test]
    fn test_workflow_credentials_resolution() {
        assert_eq!(resolve_workflow_credentials(None, None, None), WorkflowCredentials::None);
        assert_eq!(
            resolve_workflow_credentials(None, Some("t".into()), Some("p".into())),
            WorkflowCredentials::Bearer("t".into())
        );
        assert_eq!(
            resolve_workflow_credentials(Some("ops".into()), Some("t".into()), Some("p".into())),
            WorkflowCredentials::Basic { username: "ops".into(), password: "p".into() }
        );
        // username without password falls back to the token
        assert_eq!(
            resolve_workflow_credentials(Some("ops".into()), Some("t".into()), None),
            WorkflowCredentials::Bearer("t".into())
        );
    }
}

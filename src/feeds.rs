use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use crate::config::FeedsConfig;

/// What a feed looked like when we polled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub http_status: u16,
    pub entries: usize,
    pub latest_title: Option<String>,
}

/// Polls a source's RSS/Atom feed to confirm it is reachable and non-empty.
/// Parsing the entries is the workflow engine's job; this only counts them.
pub struct FeedChecker {
    client: Client,
}

impl FeedChecker {
    pub fn new(config: &FeedsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build feed HTTP client")?;
        Ok(Self { client })
    }

    pub async fn check(&self, url: &str) -> Result<FeedReport> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("feed request failed: {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("feed {} returned {}", url, status);
        }
        let body = resp.text().await.context("failed to read feed body")?;
        Ok(summarize_feed(status.as_u16(), &body))
    }
}

/// Count `<item>` (RSS) or `<entry>` (Atom) elements and pull the first title.
pub fn summarize_feed(http_status: u16, body: &str) -> FeedReport {
    let (tag, entries) = ["item", "entry"]
        .iter()
        .map(|tag| (*tag, count_elements(body, tag)))
        .find(|(_, n)| *n > 0)
        .unwrap_or(("item", 0));

    let latest_title = if entries > 0 {
        first_element_start(body, tag).and_then(|start| {
            let entry = &body[start..];
            let close = format!("</{}>", tag);
            let end = entry.find(&close).unwrap_or(entry.len());
            element_text(&entry[..end], "title")
        })
    } else {
        None
    };

    FeedReport { http_status, entries, latest_title }
}

/// Byte offset of the first `<tag>` or `<tag ...>` opening element.
fn first_element_start(body: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{}", tag);
    let mut from = 0;
    while let Some(pos) = body[from..].find(&needle) {
        let at = from + pos;
        let next = body[at + needle.len()..].chars().next();
        if matches!(next, Some('>') | Some(' ') | Some('\n') | Some('\t') | Some('\r') | Some('/')) {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

fn count_elements(body: &str, tag: &str) -> usize {
    let mut count = 0;
    let mut rest = body;
    while let Some(at) = first_element_start(rest, tag) {
        count += 1;
        rest = &rest[at + tag.len() + 1..];
    }
    count
}

fn element_text(body: &str, tag: &str) -> Option<String> {
    let start = first_element_start(body, tag)?;
    let open_end = start + body[start..].find('>')? + 1;
    let close = format!("</{}>", tag);
    let end = open_end + body[open_end..].find(&close)?;
    let raw = body[open_end..end].trim();
    let raw = raw
        .strip_prefix("<![CDATA[")
        .and_then(|r| r.strip_suffix("]]>"))
        .unwrap_or(raw);
    let text = decode_entities(raw.trim());
    (!text.is_empty()).then_some(text)
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Named XML/HTML entity or `#NNN` / `#xHH` character reference.
fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

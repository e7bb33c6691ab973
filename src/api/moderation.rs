//! Outbound content screening.
//!
//! The remote checker is advisory only. Any transport or response-shape
//! failure is treated as a clean verdict so note saving never blocks on a
//! third party being reachable. Storage failures do not get this treatment.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a screening call. `banned_terms` is empty when `is_valid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_valid: bool,
    pub banned_terms: Vec<String>,
}

impl Verdict {
    pub(crate) fn clean() -> Self {
        Self {
            is_valid: true,
            banned_terms: Vec::new(),
        }
    }
}

#[async_trait]
pub trait ContentModerator: Send + Sync {
    async fn check(&self, text: &str) -> Verdict;
}

/// Used when no screening endpoint is configured.
pub struct DisabledModerator;

#[async_trait]
impl ContentModerator for DisabledModerator {
    async fn check(&self, _text: &str) -> Verdict {
        Verdict::clean()
    }
}

/// Screens text against a remote word-list service.
pub struct RemoteModerator {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

impl RemoteModerator {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: String, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build moderation client")?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn query(&self, text: &str) -> Result<Verdict> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("text", text),
                ("key", self.api_key.expose_secret()),
                ("strict", "no"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("moderation endpoint returned {status}"));
        }

        let json: Value = response.json().await?;
        verdict_from_payload(&json)
    }
}

#[async_trait]
impl ContentModerator for RemoteModerator {
    async fn check(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::clean();
        }
        match self.query(text).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!("Content screening unavailable, allowing submission: {err}");
                Verdict::clean()
            }
        }
    }
}

/// Expected shape: `{"code": 200, "data": {"containsBannedWord": bool, "words": [..]}}`.
fn verdict_from_payload(json: &Value) -> Result<Verdict> {
    if json.get("code").and_then(Value::as_i64) != Some(200) {
        return Err(anyhow!("moderation endpoint rejected the request"));
    }
    let data = json
        .get("data")
        .context("moderation response missing data")?;
    if data.get("containsBannedWord").and_then(Value::as_bool) != Some(true) {
        return Ok(Verdict::clean());
    }
    Ok(Verdict {
        is_valid: false,
        banned_terms: collect_terms(data.get("words")),
    })
}

/// The service has shipped `words` as strings, objects, and bare scalars; keep
/// whatever can be named and fall back to a generic label.
fn collect_terms(words: Option<&Value>) -> Vec<String> {
    let mut terms = Vec::new();
    match words {
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(word) => terms.push(word.clone()),
                    Value::Object(map) => {
                        if let Some(word) = map.get("word").and_then(Value::as_str) {
                            terms.push(word.to_string());
                        }
                    }
                    other => terms.push(other.to_string()),
                }
            }
        }
        Some(Value::String(word)) => terms.push(word.clone()),
        _ => {}
    }
    if terms.is_empty() {
        terms.push("flagged content".to_string());
    }
    terms
}

//! Mobile push delivery through an Expo-compatible HTTP endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::NotificationConfig;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    pub sound: &'static str,
}

/// What the provider told us about a batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PushReport {
    pub delivered: usize,
    pub failed: usize,
    /// Tokens the provider no longer recognizes; callers should forget them.
    pub unregistered: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait PushSender: Send + Sync + std::fmt::Debug {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<PushReport, PushError>;
}

/// Used when push is disabled.
#[derive(Debug, Default)]
pub struct NoopPushSender;

#[async_trait]
impl PushSender for NoopPushSender {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<PushReport, PushError> {
        tracing::debug!(count = messages.len(), "push disabled, dropping messages");
        Ok(PushReport::default())
    }
}

#[derive(Debug)]
pub struct ExpoPushSender {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<ExpoTicketDetails>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicketDetails {
    #[serde(default)]
    error: Option<String>,
}

impl ExpoPushSender {
    pub fn new(config: &NotificationConfig) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.push_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.push_endpoint.clone(),
        })
    }
}

/// Pair tickets with the messages they answer (same order) and sort them out.
fn summarize(messages: &[PushMessage], tickets: Vec<ExpoTicket>) -> PushReport {
    let mut report = PushReport::default();
    for (message, ticket) in messages.iter().zip(tickets) {
        if ticket.status == "ok" {
            report.delivered += 1;
            continue;
        }
        report.failed += 1;
        let code = ticket.details.and_then(|d| d.error);
        if code.as_deref() == Some("DeviceNotRegistered") {
            report.unregistered.push(message.to.clone());
        } else {
            tracing::warn!(
                token = %message.to,
                code = code.as_deref().unwrap_or("unknown"),
                "push ticket error: {}",
                ticket.message.unwrap_or_default()
            );
        }
    }
    report
}

#[async_trait]
impl PushSender for ExpoPushSender {
    async fn send(&self, messages: Vec<PushMessage>) -> Result<PushReport, PushError> {
        if messages.is_empty() {
            return Ok(PushReport::default());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&messages)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ExpoResponse = response.json().await?;
        Ok(summarize(&messages, parsed.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(to: &str) -> PushMessage {
        PushMessage {
            to: to.to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            data: Value::Null,
            sound: "default",
        }
    }

    #[test]
    fn unregistered_devices_are_collected() {
        let response: ExpoResponse = serde_json::from_value(json!({
            "data": [
                { "status": "ok", "id": "1" },
                { "status": "error", "message": "gone", "details": { "error": "DeviceNotRegistered" } },
                { "status": "error", "message": "too big", "details": { "error": "MessageTooBig" } }
            ]
        }))
        .unwrap();

        let messages = vec![message("a"), message("b"), message("c")];
        let report = summarize(&messages, response.data);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.unregistered, vec!["b".to_string()]);
    }

    #[test]
    fn null_data_is_omitted_on_the_wire() {
        let wire = serde_json::to_value(message("tok")).unwrap();
        assert!(wire.get("data").is_none());
        assert_eq!(wire["sound"], "default");
    }

    #[tokio::test]
    async fn noop_sender_reports_nothing() {
        let report = NoopPushSender.send(vec![message("x")]).await.unwrap();
        assert_eq!(report, PushReport::default());
    }
}

//! Slack Web API history source

use super::{http_client, read_json, Channel, HistorySource, ServiceError};
use crate::state::payload::ConversationMessage;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;

const SERVICE: &str = "slack";
const API_BASE: &str = "https://slack.com/api";

pub struct SlackHistorySource {
    client: Client,
    token: String,
}

impl SlackHistorySource {
    pub fn new(token: String) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(SERVICE)?,
            token,
        })
    }

    /// Slack answers 200 with `ok: false` for most failures
    async fn call(&self, method: &str, query: &[(&str, String)]) -> Result<Value, ServiceError> {
        let response = self
            .client
            .get(format!("{API_BASE}/{method}"))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await;
        let body = read_json(SERVICE, response).await?;
        if body.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(body)
        } else {
            Err(ServiceError::Rejected {
                service: SERVICE,
                message: body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown_error")
                    .to_string(),
            })
        }
    }

    async fn resolve_channel(&self, channel: &str) -> Result<String, ServiceError> {
        let wanted = channel.trim_start_matches('#');
        let channels = self.list_channels().await?;
        Ok(channels
            .into_iter()
            .find(|c| c.name == wanted || c.id == wanted)
            .map_or_else(|| wanted.to_string(), |c| c.id))
    }
}

/// Render a Slack `ts` ("1712345678.000200") as RFC 3339
fn format_ts(ts: &str) -> String {
    let secs = ts
        .split('.')
        .next()
        .and_then(|s| s.parse::<i64>().ok());
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
        .map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
}

fn parse_channels(body: &Value) -> Vec<Channel> {
    body.get("channels")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| {
                    Some(Channel {
                        id: c.get("id")?.as_str()?.to_string(),
                        name: c.get("name")?.as_str()?.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Slack returns newest first; the result is oldest first
fn parse_messages(body: &Value) -> Vec<ConversationMessage> {
    let mut messages: Vec<ConversationMessage> = body
        .get("messages")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|m| {
                    let author = ["user_profile", "username", "user", "bot_id"]
                        .iter()
                        .find_map(|field| match m.get(*field) {
                            Some(Value::String(s)) => Some(s.clone()),
                            Some(Value::Object(profile)) => profile
                                .get("real_name")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            _ => None,
                        })
                        .unwrap_or_else(|| "unknown".to_string());
                    ConversationMessage {
                        author,
                        text: m
                            .get("text")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        timestamp: format_ts(m.get("ts").and_then(Value::as_str).unwrap_or("")),
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    messages.reverse();
    messages
}

#[async_trait]
impl HistorySource for SlackHistorySource {
    async fn list_channels(&self) -> Result<Vec<Channel>, ServiceError> {
        let body = self
            .call(
                "conversations.list",
                &[
                    ("limit", "200".to_string()),
                    ("types", "public_channel,private_channel".to_string()),
                    ("exclude_archived", "true".to_string()),
                ],
            )
            .await?;
        Ok(parse_channels(&body))
    }

    async fn history(
        &self,
        channel: &str,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, ServiceError> {
        let channel_id = self.resolve_channel(channel).await?;
        let body = self
            .call(
                "conversations.history",
                &[("channel", channel_id), ("limit", limit.to_string())],
            )
            .await?;
        Ok(parse_messages(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_render_as_rfc3339() {
        assert_eq!(format_ts("1700000000.000200"), "2023-11-14T22:13:20+00:00");
        assert_eq!(format_ts("garbage"), "garbage");
    }

    #[test]
    fn messages_are_returned_oldest_first() {
        let body = json!({
            "ok": true,
            "messages": [
                {"user": "U2", "text": "second", "ts": "1700000060.0"},
                {"username": "deploy-bot", "text": "first", "ts": "1700000000.0"}
            ]
        });

        let messages = parse_messages(&body);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[0].author, "deploy-bot");
        assert_eq!(messages[1].author, "U2");
    }

    #[test]
    fn channels_without_names_are_skipped() {
        let body = json!({"channels": [{"id": "C1", "name": "general"}, {"id": "C2"}]});
        assert_eq!(
            parse_channels(&body),
            vec![Channel {
                id: "C1".to_string(),
                name: "general".to_string()
            }]
        );
    }
}

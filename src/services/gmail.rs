//! Gmail REST API gateway

use super::{http_client, read_json, EmailGateway, EmailSummary, OutgoingEmail, ServiceError};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};

const SERVICE: &str = "gmail";
const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

pub struct GmailGateway {
    client: Client,
    access_token: String,
}

impl GmailGateway {
    pub fn new(access_token: String) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(SERVICE)?,
            access_token,
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ServiceError> {
        let response = self
            .client
            .get(format!("{API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await;
        read_json(SERVICE, response).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(format!("{API_BASE}/{path}"))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await;
        read_json(SERVICE, response).await
    }

    async fn summary(&self, id: &str) -> Result<EmailSummary, ServiceError> {
        let message = self
            .get(
                &format!("messages/{id}"),
                &[
                    ("format", "metadata".to_string()),
                    ("metadataHeaders", "From".to_string()),
                    ("metadataHeaders", "Subject".to_string()),
                ],
            )
            .await?;
        Ok(summary_from_message(id, &message))
    }
}

/// RFC 822 message, base64url-encoded as the API expects
fn encode_raw(email: &OutgoingEmail) -> String {
    let mut lines = vec![format!("To: {}", email.to.join(", "))];
    if !email.cc.is_empty() {
        lines.push(format!("Cc: {}", email.cc.join(", ")));
    }
    lines.push(format!("Subject: {}", email.subject));
    lines.push("MIME-Version: 1.0".to_string());
    lines.push("Content-Type: text/plain; charset=\"UTF-8\"".to_string());
    lines.push(String::new());
    lines.push(email.body.clone());
    URL_SAFE_NO_PAD.encode(lines.join("\r\n"))
}

fn header(message: &Value, name: &str) -> Option<String> {
    message
        .pointer("/payload/headers")
        .and_then(Value::as_array)?
        .iter()
        .find(|h| {
            h.get("name")
                .and_then(Value::as_str)
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn summary_from_message(id: &str, message: &Value) -> EmailSummary {
    EmailSummary {
        id: id.to_string(),
        thread_id: message
            .get("threadId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        from: header(message, "From"),
        subject: header(message, "Subject"),
        snippet: message
            .get("snippet")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn id_of(service_response: &Value) -> Result<String, ServiceError> {
    service_response
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Decode {
            service: SERVICE,
            message: "missing id".to_string(),
        })
}

#[async_trait]
impl EmailGateway for GmailGateway {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, ServiceError> {
        let response = self
            .post("messages/send", &json!({"raw": encode_raw(email)}))
            .await?;
        id_of(&response)
    }

    async fn draft(&self, email: &OutgoingEmail) -> Result<String, ServiceError> {
        let response = self
            .post("drafts", &json!({"message": {"raw": encode_raw(email)}}))
            .await?;
        id_of(&response)
    }

    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<EmailSummary>, ServiceError> {
        let listing = self
            .get(
                "messages",
                &[
                    ("q", query.to_string()),
                    ("maxResults", max_results.to_string()),
                ],
            )
            .await?;

        let ids: Vec<String> = listing
            .get("messages")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| m.get("id").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut summaries = Vec::with_capacity(ids.len());
        for id in &ids {
            summaries.push(self.summary(id).await?);
        }
        Ok(summaries)
    }
}

//! Email tools over the configured [`EmailGateway`](crate::services::EmailGateway)

use super::{Tool, ToolContext, ToolError};
use crate::services::{sha256_hex, OutgoingEmail};
use crate::state::payload::{EmailAction, EmailResult};
use crate::state::NetworkState;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_SEARCH_RESULTS: u32 = 10;
const MAX_SEARCH_RESULTS: u32 = 50;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComposeInput {
    to: Vec<String>,
    #[serde(default)]
    cc: Vec<String>,
    subject: String,
    body: String,
}

impl ComposeInput {
    fn check(&self) -> Result<(), String> {
        if self.to.is_empty() {
            return Err("at least one recipient is required".to_string());
        }
        if let Some(bad) = self.to.iter().chain(&self.cc).find(|a| !a.contains('@')) {
            return Err(format!("'{bad}' is not an email address"));
        }
        Ok(())
    }

    /// Digest of everything that reaches the gateway
    fn fingerprint(&self) -> String {
        let canonical = json!([self.to, self.cc, self.subject, self.body]);
        sha256_hex(canonical.to_string().as_bytes())
    }

    fn into_email(self) -> OutgoingEmail {
        OutgoingEmail {
            to: self.to,
            cc: self.cc,
            subject: self.subject,
            body: self.body,
        }
    }
}

/// Message of an identical send or draft already recorded in this run
fn already_done(state: &NetworkState, action: EmailAction, fingerprint: &str) -> Option<String> {
    state
        .email_result
        .as_ref()
        .filter(|r| r.action == action && r.details["fingerprint"] == fingerprint)
        .map(|r| r.message.clone())
}

fn compose_schema() -> Value {
    json!({
        "type": "object",
        "required": ["to", "subject", "body"],
        "additionalProperties": false,
        "properties": {
            "to": {"type": "array", "items": {"type": "string"}, "minItems": 1},
            "cc": {"type": "array", "items": {"type": "string"}},
            "subject": {"type": "string"},
            "body": {"type": "string", "description": "Plain-text body"}
        }
    })
}

// ============================================================================
// send_email
// ============================================================================

pub struct SendEmailTool;

#[async_trait]
impl Tool for SendEmailTool {
    type Input = ComposeInput;

    fn name(&self) -> &'static str {
        "send_email"
    }

    fn description(&self) -> String {
        "Send an email immediately. Only use when the user clearly asked to send.".to_string()
    }

    fn input_schema(&self) -> Value {
        compose_schema()
    }

    fn validate(&self, input: &ComposeInput) -> Result<(), String> {
        input.check()
    }

    async fn run(&self, input: ComposeInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let fingerprint = input.fingerprint();
        if let Some(message) = already_done(ctx.state, EmailAction::Send, &fingerprint) {
            return Ok(message);
        }
        let email = input.into_email();
        let id = ctx.services.email.send(&email).await?;
        let message = format!("Email sent to {} (id {id}).", email.to.join(", "));
        ctx.state.email_result = Some(EmailResult {
            action: EmailAction::Send,
            message: message.clone(),
            details: json!({
                "id": id,
                "to": email.to,
                "subject": email.subject,
                "fingerprint": fingerprint,
            }),
        });
        Ok(message)
    }
}

// ============================================================================
// draft_email
// ============================================================================

pub struct DraftEmailTool;

#[async_trait]
impl Tool for DraftEmailTool {
    type Input = ComposeInput;

    fn name(&self) -> &'static str {
        "draft_email"
    }

    fn description(&self) -> String {
        "Save an email as a draft without sending it.".to_string()
    }

    fn input_schema(&self) -> Value {
        compose_schema()
    }

    fn validate(&self, input: &ComposeInput) -> Result<(), String> {
        input.check()
    }

    async fn run(&self, input: ComposeInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let fingerprint = input.fingerprint();
        if let Some(message) = already_done(ctx.state, EmailAction::Draft, &fingerprint) {
            return Ok(message);
        }
        let email = input.into_email();
        let id = ctx.services.email.draft(&email).await?;
        let message = format!("Draft \"{}\" saved (id {id}).", email.subject);
        ctx.state.email_result = Some(EmailResult {
            action: EmailAction::Draft,
            message: message.clone(),
            details: json!({
                "id": id,
                "to": email.to,
                "subject": email.subject,
                "fingerprint": fingerprint,
            }),
        });
        Ok(message)
    }
}

// ============================================================================
// search_email
// ============================================================================

pub struct SearchEmailTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchInput {
    query: String,
    #[serde(default)]
    max_results: Option<u32>,
}

#[async_trait]
impl Tool for SearchEmailTool {
    type Input = SearchInput;

    fn name(&self) -> &'static str {
        "search_email"
    }

    fn description(&self) -> String {
        "Search the mailbox with a Gmail-style query (e.g. 'from:alice newer_than:7d').".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "additionalProperties": false,
            "properties": {
                "query": {"type": "string"},
                "maxResults": {"type": "integer", "minimum": 1, "maximum": MAX_SEARCH_RESULTS}
            }
        })
    }

    fn validate(&self, input: &SearchInput) -> Result<(), String> {
        if input.query.trim().is_empty() {
            return Err("query must not be empty".to_string());
        }
        Ok(())
    }

    async fn run(&self, input: SearchInput, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let max = input
            .max_results
            .unwrap_or(DEFAULT_SEARCH_RESULTS)
            .clamp(1, MAX_SEARCH_RESULTS);
        let found = ctx.services.email.search(&input.query, max).await?;

        let mut output = format!("Found {} emails for \"{}\".", found.len(), input.query);
        for email in &found {
            output.push_str(&format!(
                "\n- {} | {} | {}",
                email.from.as_deref().unwrap_or("(unknown sender)"),
                email.subject.as_deref().unwrap_or("(no subject)"),
                email.snippet
            ));
        }

        ctx.state.email_result = Some(EmailResult {
            action: EmailAction::Search,
            message: format!("Found {} emails.", found.len()),
            details: json!({"query": input.query, "emails": found}),
        });
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::MockEmailGateway;
    use crate::services::Services;
    use crate::state::{NetworkState, StateKey};
    use crate::tools::test_support::context;
    use crate::tools::{InvocationStatus, ToolCall, ToolSet};
    use std::sync::Arc;

    fn set() -> ToolSet {
        ToolSet::new()
            .with(SendEmailTool)
            .with(DraftEmailTool)
            .with(SearchEmailTool)
    }

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: "tu".to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[tokio::test]
    async fn send_records_result_and_reaches_gateway() {
        let gateway = Arc::new(MockEmailGateway::default());
        let services = Services {
            email: gateway.clone(),
            ..Services::offline()
        };
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call(
                    "send_email",
                    json!({"to": ["sam@example.com"], "subject": "Hi", "body": "Lunch?"}),
                ),
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded(), "{}", inv.output);
        assert_eq!(gateway.sent().len(), 1);
        let result = state.email_result.as_ref().unwrap();
        assert_eq!(result.action, EmailAction::Send);
        assert!(!state.has_terminal());
    }

    #[tokio::test]
    async fn repeated_send_reaches_gateway_once() {
        let gateway = Arc::new(MockEmailGateway::default());
        let services = Services {
            email: gateway.clone(),
            ..Services::offline()
        };
        let mut state = NetworkState::default();
        let input = json!({"to": ["sam@example.com"], "subject": "Hi", "body": "Lunch?"});

        let first = set()
            .dispatch(call("send_email", input.clone()), &mut context(&mut state, &services))
            .await;
        let recorded = state.email_result.clone();
        let second = set()
            .dispatch(call("send_email", input), &mut context(&mut state, &services))
            .await;

        assert!(second.succeeded(), "{}", second.output);
        assert_eq!(gateway.sent().len(), 1);
        assert_eq!(first.output, second.output);
        assert_eq!(state.email_result, recorded);

        // a different body is a new email
        let third = set()
            .dispatch(
                call(
                    "send_email",
                    json!({"to": ["sam@example.com"], "subject": "Hi", "body": "Dinner?"}),
                ),
                &mut context(&mut state, &services),
            )
            .await;
        assert!(third.succeeded());
        assert_eq!(gateway.sent().len(), 2);
    }

    #[tokio::test]
    async fn repeated_draft_is_saved_once() {
        let gateway = Arc::new(MockEmailGateway::default());
        let services = Services {
            email: gateway.clone(),
            ..Services::offline()
        };
        let mut state = NetworkState::default();
        let input = json!({"to": ["sam@example.com"], "subject": "Plan", "body": "Draft"});

        for _ in 0..2 {
            let inv = set()
                .dispatch(call("draft_email", input.clone()), &mut context(&mut state, &services))
                .await;
            assert!(inv.succeeded(), "{}", inv.output);
        }
        assert_eq!(gateway.drafts().len(), 1);
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn draft_is_saved_not_sent() {
        let gateway = Arc::new(MockEmailGateway::default());
        let services = Services {
            email: gateway.clone(),
            ..Services::offline()
        };
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call(
                    "draft_email",
                    json!({"to": ["sam@example.com"], "cc": ["kim@example.com"], "subject": "Plan", "body": "Draft"}),
                ),
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded(), "{}", inv.output);
        assert!(gateway.sent().is_empty());
        assert_eq!(gateway.drafts()[0].cc, vec!["kim@example.com".to_string()]);
        assert_eq!(state.email_result.as_ref().unwrap().details["id"], "draft-1");
    }

    #[tokio::test]
    async fn bad_address_is_a_validation_error() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call("draft_email", json!({"to": ["sam"], "subject": "Hi", "body": "x"})),
                &mut context(&mut state, &services),
            )
            .await;

        assert_eq!(inv.status, InvocationStatus::ValidationFailed);
        assert!(inv.output.contains("'sam'"));
    }

    #[tokio::test]
    async fn unconfigured_gateway_fails_without_mutation() {
        let services = Services::offline();
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call("search_email", json!({"query": "from:boss"})),
                &mut context(&mut state, &services),
            )
            .await;

        assert_eq!(inv.status, InvocationStatus::HandlerFailed);
        assert!(inv.output.contains("GMAIL_ACCESS_TOKEN"));
        assert!(!state.has(StateKey::EmailResult));
    }

    #[tokio::test]
    async fn search_lists_matches() {
        let gateway = Arc::new(MockEmailGateway::default());
        let services = Services {
            email: gateway.clone(),
            ..Services::offline()
        };
        let mut state = NetworkState::default();

        let inv = set()
            .dispatch(
                call("search_email", json!({"query": "lunch", "maxResults": 500})),
                &mut context(&mut state, &services),
            )
            .await;

        assert!(inv.succeeded(), "{}", inv.output);
        assert!(inv.output.starts_with("Found 1 emails"));
        assert_eq!(gateway.last_search_limit(), Some(MAX_SEARCH_RESULTS));
    }
}

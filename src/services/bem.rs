//! bem.ai transform API client

use super::{http_client, read_json, CreatedPipeline, DataTransformer, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const SERVICE: &str = "bem";

pub struct BemTransformer {
    client: Client,
    api_key: String,
    base_url: String,
}

impl BemTransformer {
    pub fn new(api_key: String, base_url: &str) -> Result<Self, ServiceError> {
        Ok(Self {
            client: http_client(SERVICE)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await;
        read_json(SERVICE, response).await
    }
}

/// Pull the structured output out of a transformations response.
///
/// The API has returned it both at the top level and per transformation;
/// fall back to the whole body when neither is present.
fn extract_output(body: Value) -> Value {
    if let Some(output) = body.get("outputJson") {
        return output.clone();
    }
    if let Some(output) = body
        .get("transformations")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(|first| first.get("outputJson"))
    {
        return output.clone();
    }
    body
}

#[async_trait]
impl DataTransformer for BemTransformer {
    async fn create_pipeline(
        &self,
        name: &str,
        output_schema: &Value,
    ) -> Result<CreatedPipeline, ServiceError> {
        let body = json!({
            "name": name,
            "outputSchemaName": name,
            "outputSchema": output_schema,
        });
        let response = self.post("pipelines", &body).await?;

        let id = response
            .get("pipelineID")
            .and_then(Value::as_str)
            .ok_or_else(|| ServiceError::Decode {
                service: SERVICE,
                message: "missing pipelineID".to_string(),
            })?
            .to_string();
        let inbox_email = response
            .get("inboxEmail")
            .and_then(Value::as_str)
            .map(str::to_string);

        tracing::info!(pipeline_id = %id, name, "Created transform pipeline");
        Ok(CreatedPipeline { id, inbox_email })
    }

    async fn transform(
        &self,
        pipeline_id: &str,
        reference_id: &str,
        input: &str,
    ) -> Result<Value, ServiceError> {
        let body = json!({
            "pipelineID": pipeline_id,
            "transformations": [{
                "referenceID": reference_id,
                "inputType": "text",
                "inputContent": input,
            }],
        });
        let response = self.post("transformations", &body).await?;
        Ok(extract_output(response))
    }
}

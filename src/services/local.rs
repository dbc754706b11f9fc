//! In-process transformer used when no bem.ai key is configured
//!
//! Applies the pipeline's output schema directly: string fields are
//! stringified, number fields parsed, and rows missing a required field are
//! dropped. Fields the schema does not mention pass through untouched.

use super::{sha256_hex, CreatedPipeline, DataTransformer, ServiceError};
use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

const SERVICE: &str = "local-transformer";

#[derive(Default)]
pub struct LocalTransformer {
    /// Output schema per pipeline id
    pipelines: Mutex<HashMap<String, Value>>,
}

/// Pipeline ids derive from the schema, so re-creating is a no-op
fn pipeline_id(schema: &Value) -> String {
    let digest = sha256_hex(schema.to_string().as_bytes());
    let short: String = digest.chars().take(16).collect();
    format!("local-{short}")
}

fn parse_number(raw: &str) -> Option<Number> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '%' | '_') && !c.is_whitespace())
        .collect();
    if let Ok(int) = cleaned.parse::<i64>() {
        return Some(Number::from(int));
    }
    cleaned.parse::<f64>().ok().and_then(Number::from_f64)
}

fn coerce(value: &Value, kind: &str) -> Option<Value> {
    match (kind, value) {
        (_, Value::Null) => None,
        ("string", Value::String(_)) | ("number", Value::Number(_)) => Some(value.clone()),
        ("string", Value::Bool(b)) => Some(Value::String(b.to_string())),
        ("string", Value::Number(n)) => Some(Value::String(n.to_string())),
        ("string", other) => Some(Value::String(other.to_string())),
        ("number", Value::String(s)) => parse_number(s).map(Value::Number),
        ("number", _) => None,
        (_, other) => Some(other.clone()),
    }
}

/// Apply `schema` (an array-of-objects JSON schema) to `rows`
fn apply_schema(schema: &Value, rows: &[Value]) -> Vec<Value> {
    let items = schema.get("items").unwrap_or(&Value::Null);
    let properties = items.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = items
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    rows.iter()
        .filter_map(Value::as_object)
        .filter_map(|row| {
            let mut out = Map::new();
            for (field, value) in row {
                let kind = properties
                    .and_then(|p| p.get(field))
                    .and_then(|spec| spec.get("type"))
                    .and_then(Value::as_str);
                let coerced = match kind {
                    Some(kind) => coerce(value, kind),
                    None => Some(value.clone()),
                };
                if let Some(v) = coerced {
                    out.insert(field.clone(), v);
                }
            }
            required
                .iter()
                .all(|field| out.contains_key(*field))
                .then_some(Value::Object(out))
        })
        .collect()
}

#[async_trait]
impl DataTransformer for LocalTransformer {
    async fn create_pipeline(
        &self,
        name: &str,
        output_schema: &Value,
    ) -> Result<CreatedPipeline, ServiceError> {
        let id = pipeline_id(output_schema);
        self.pipelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), output_schema.clone());
        tracing::debug!(pipeline_id = %id, name, "Registered local pipeline");
        Ok(CreatedPipeline {
            id,
            inbox_email: None,
        })
    }

    async fn transform(
        &self,
        pipeline_id: &str,
        _reference_id: &str,
        input: &str,
    ) -> Result<Value, ServiceError> {
        let schema = self
            .pipelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pipeline_id)
            .cloned()
            .ok_or_else(|| ServiceError::Rejected {
                service: SERVICE,
                message: format!("unknown pipeline {pipeline_id}"),
            })?;

        let parsed: Value = serde_json::from_str(input).map_err(|e| ServiceError::Rejected {
            service: SERVICE,
            message: format!("input is not JSON: {e}"),
        })?;
        let rows = match parsed {
            Value::Array(rows) => rows,
            obj @ Value::Object(_) => vec![obj],
            _ => {
                return Err(ServiceError::Rejected {
                    service: SERVICE,
                    message: "input must be an array of objects".to_string(),
                })
            }
        };

        Ok(Value::Array(apply_schema(&schema, &rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "region": {"type": "string"},
                    "revenue": {"type": "number"},
                    "note": {"type": "string"}
                },
                "required": ["region", "revenue"]
            }
        })
    }

    #[test]
    fn numbers_are_parsed_and_strings_stringified() {
        let rows = vec![
            json!({"region": "North", "revenue": "$1,200"}),
            json!({"region": 7, "revenue": 3.5, "note": true}),
        ];
        let out = apply_schema(&schema(), &rows);
        assert_eq!(
            out,
            vec![
                json!({"region": "North", "revenue": 1200}),
                json!({"region": "7", "revenue": 3.5, "note": "true"}),
            ]
        );
    }

    #[test]
    fn rows_missing_required_fields_are_dropped() {
        let rows = vec![
            json!({"region": "North"}),
            json!({"region": "South", "revenue": "n/a"}),
            json!("not a row"),
            json!({"region": "East", "revenue": 5, "extra": [1]}),
        ];
        let out = apply_schema(&schema(), &rows);
        assert_eq!(out, vec![json!({"region": "East", "revenue": 5, "extra": [1]})]);
    }

    #[tokio::test]
    async fn pipeline_ids_are_deterministic() {
        let transformer = LocalTransformer::default();
        let a = transformer.create_pipeline("bar", &schema()).await.unwrap();
        let b = transformer.create_pipeline("bar again", &schema()).await.unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("local-"));
    }

    #[tokio::test]
    async fn transform_requires_known_pipeline() {
        let transformer = LocalTransformer::default();
        let err = transformer.transform("missing", "ref", "[]").await.unwrap_err();
        assert!(matches!(err, ServiceError::Rejected { .. }));
    }

    #[tokio::test]
    async fn transform_round_trip() {
        let transformer = LocalTransformer::default();
        let pipeline = transformer.create_pipeline("bar", &schema()).await.unwrap();

        let out = transformer
            .transform(
                &pipeline.id,
                "ref",
                r#"[{"region": "North", "revenue": "10"}, {"region": "South", "revenue": 4}]"#,
            )
            .await
            .unwrap();

        assert_eq!(
            out,
            json!([{"region": "North", "revenue": 10}, {"region": "South", "revenue": 4}])
        );
    }
}

use async_trait::async_trait;
use opcore::{DataType, Operation, OperationContext, OperationError, Returned, Signature, Value};
use opruntime::{OperationFactory, OperationMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Parse JSON string to Value
pub struct JsonParse;

#[async_trait]
impl Operation for JsonParse {
    fn kind(&self) -> &str {
        "transform.json_parse"
    }

    fn signature(&self) -> Signature {
        Signature::new()
            .with_input("json", DataType::String)
            .with_output("parsed", DataType::Json)
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        let input = ctx.require_input("json")?;
        let text = input.as_str().ok_or_else(|| OperationError::InvalidInputType {
            field: "json".to_string(),
            expected: DataType::String.name(),
            actual: input.data_type().name(),
        })?;

        let parsed: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| OperationError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(Value::Json(parsed).into())
    }
}

pub struct JsonParseFactory;

impl OperationFactory for JsonParseFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        Ok(Arc::new(JsonParse))
    }

    fn kind(&self) -> &str {
        "transform.json_parse"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Parse JSON string".to_string(),
            category: "transform".to_string(),
        }
    }
}

/// Stringify Value to JSON
pub struct JsonStringify;

#[async_trait]
impl Operation for JsonStringify {
    fn kind(&self) -> &str {
        "transform.json_stringify"
    }

    fn signature(&self) -> Signature {
        Signature::new()
            .with_input("parsed", DataType::Json)
            .with_output("json", DataType::String)
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        let value = ctx.require_input("parsed")?.to_plain_json();

        let json_str = serde_json::to_string_pretty(&value)
            .map_err(|e| OperationError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(Value::String(json_str).into())
    }
}

pub struct JsonStringifyFactory;

impl OperationFactory for JsonStringifyFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        Ok(Arc::new(JsonStringify))
    }

    fn kind(&self) -> &str {
        "transform.json_stringify"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Convert value to JSON string".to_string(),
            category: "transform".to_string(),
        }
    }
}

use async_trait::async_trait;
use opcore::{DataType, Operation, OperationContext, OperationError, Returned, Signature, Value};
use opruntime::{OperationFactory, OperationMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Logs its message and passes it on
pub struct DebugLog;

#[async_trait]
impl Operation for DebugLog {
    fn kind(&self) -> &str {
        "debug.log"
    }

    fn signature(&self) -> Signature {
        Signature::new()
            .with_input("message", DataType::String)
            .with_output("message", DataType::String)
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        let message = match ctx.inputs.get("message").and_then(|v| v.as_str()) {
            Some(message) => message.to_string(),
            None => {
                ctx.events.warn("no 'message' input, logging a placeholder");
                "(no message)".to_string()
            }
        };

        tracing::debug!("node {}: {}", ctx.node_id, message);
        ctx.events.info(format!("DEBUG: {}", message));
        ctx.events.data("message", Value::String(message.clone()));

        Ok(Value::String(message).into())
    }
}

pub struct DebugFactory;

impl OperationFactory for DebugFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        Ok(Arc::new(DebugLog))
    }

    fn kind(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Logs its message for debugging".to_string(),
            category: "debug".to_string(),
        }
    }
}

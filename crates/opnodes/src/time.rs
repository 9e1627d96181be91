use async_trait::async_trait;
use opcore::{DataType, Operation, OperationContext, OperationError, Returned, Signature, Value};
use opruntime::{OperationFactory, OperationMetadata};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Wait, then pass one named value through unchanged
pub struct Delay {
    delay: Duration,
    port: String,
    data_type: DataType,
}

impl Delay {
    pub fn new(delay: Duration, port: impl Into<String>, data_type: DataType) -> Self {
        Self {
            delay,
            port: port.into(),
            data_type,
        }
    }
}

#[async_trait]
impl Operation for Delay {
    fn kind(&self) -> &str {
        "time.delay"
    }

    fn signature(&self) -> Signature {
        Signature::new()
            .with_input(self.port.clone(), self.data_type.clone())
            .with_output(self.port.clone(), self.data_type.clone())
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        ctx.events
            .info(format!("Delaying for {}ms", self.delay.as_millis()));

        tokio::select! {
            _ = sleep(self.delay) => {}
            _ = ctx.cancellation.cancelled() => return Err(OperationError::Cancelled),
        }
        ctx.events.progress(100.0, Some("delay elapsed".to_string()));

        let value = ctx.require_input(&self.port)?.clone();
        Ok(value.into())
    }
}

pub struct DelayFactory;

impl OperationFactory for DelayFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        let delay_ms = config
            .get("delay_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(1000.0);
        if !delay_ms.is_finite() || delay_ms < 0.0 {
            return Err(OperationError::Configuration(format!(
                "delay_ms must be a non-negative number, got {}",
                delay_ms
            )));
        }

        let port = config
            .get("port")
            .and_then(|v| v.as_str())
            .unwrap_or("value");
        let data_type = config
            .get("data_type")
            .and_then(|v| v.as_str())
            .map(DataType::parse)
            .unwrap_or(DataType::Json);

        Ok(Arc::new(Delay::new(
            Duration::from_millis(delay_ms as u64),
            port,
            data_type,
        )))
    }

    fn kind(&self) -> &str {
        "time.delay"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Delay execution for specified milliseconds".to_string(),
            category: "time".to_string(),
        }
    }
}

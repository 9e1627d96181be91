use async_trait::async_trait;
use opcore::{DataType, Operation, OperationContext, OperationError, Returned, Signature, Value};
use opruntime::{OperationFactory, OperationMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// `sum = a + b`
pub struct Add;

#[async_trait]
impl Operation for Add {
    fn kind(&self) -> &str {
        "math.add"
    }

    fn signature(&self) -> Signature {
        Signature::new()
            .with_input("a", DataType::Number)
            .with_input("b", DataType::Number)
            .with_output("sum", DataType::Number)
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        let a = ctx.require_number("a")?;
        let b = ctx.require_number("b")?;
        Ok(Value::Number(a + b).into())
    }
}

pub struct AddFactory;

impl OperationFactory for AddFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        Ok(Arc::new(Add))
    }

    fn kind(&self) -> &str {
        "math.add"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Add inputs a and b".to_string(),
            category: "math".to_string(),
        }
    }
}

/// Multiply a named number by a configured factor, keeping its name
pub struct Scale {
    port: String,
    factor: f64,
}

impl Scale {
    pub fn new(port: impl Into<String>, factor: f64) -> Self {
        Self {
            port: port.into(),
            factor,
        }
    }
}

#[async_trait]
impl Operation for Scale {
    fn kind(&self) -> &str {
        "math.scale"
    }

    fn signature(&self) -> Signature {
        Signature::new()
            .with_input(self.port.clone(), DataType::Number)
            .with_output(self.port.clone(), DataType::Number)
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        let value = ctx.require_number(&self.port)?;
        Ok(Value::Number(value * self.factor).into())
    }
}

pub struct ScaleFactory;

impl OperationFactory for ScaleFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        let factor = match config.get("factor") {
            Some(value) => value.as_f64().ok_or_else(|| {
                OperationError::Configuration("'factor' must be a number".to_string())
            })?,
            None => 1.0,
        };
        let port = config
            .get("port")
            .and_then(|v| v.as_str())
            .unwrap_or("value");
        Ok(Arc::new(Scale::new(port, factor)))
    }

    fn kind(&self) -> &str {
        "math.scale"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Multiply a number by a constant factor".to_string(),
            category: "math".to_string(),
        }
    }
}

/// Truncated division returning `(quotient, remainder)`
pub struct DivMod;

#[async_trait]
impl Operation for DivMod {
    fn kind(&self) -> &str {
        "math.divmod"
    }

    fn signature(&self) -> Signature {
        Signature::new()
            .with_input("dividend", DataType::Number)
            .with_input("divisor", DataType::Number)
            .with_output("quotient", DataType::Number)
            .with_output("remainder", DataType::Number)
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        let dividend = ctx.require_number("dividend")?;
        let divisor = ctx.require_number("divisor")?;
        if divisor == 0.0 {
            return Err(OperationError::ExecutionFailed("division by zero".to_string()));
        }
        let quotient = (dividend / divisor).trunc();
        Ok(Returned::tuple([quotient, dividend - quotient * divisor]))
    }
}

pub struct DivModFactory;

impl OperationFactory for DivModFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        Ok(Arc::new(DivMod))
    }

    fn kind(&self) -> &str {
        "math.divmod"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Quotient and remainder of dividend / divisor".to_string(),
            category: "math".to_string(),
        }
    }
}

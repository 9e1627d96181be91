use async_trait::async_trait;
use opcore::{Operation, OperationContext, OperationError, Returned, Signature, Value};
use opruntime::{OperationFactory, OperationMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Source operation that emits fixed values
///
/// Each configured entry becomes one output, named after its key, typed after
/// its value. Outputs are declared in key order.
pub struct Constant {
    outputs: Vec<(String, Value)>,
}

impl Constant {
    pub fn new<I, K>(outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut outputs: Vec<(String, Value)> =
            outputs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        outputs.sort_by(|a, b| a.0.cmp(&b.0));
        outputs.dedup_by(|later, earlier| later.0 == earlier.0);
        Self { outputs }
    }
}

#[async_trait]
impl Operation for Constant {
    fn kind(&self) -> &str {
        "source.constant"
    }

    fn signature(&self) -> Signature {
        self.outputs
            .iter()
            .fold(Signature::new(), |sig, (name, value)| {
                sig.with_output(name.clone(), value.data_type())
            })
    }

    async fn run(&self, _ctx: OperationContext) -> Result<Returned, OperationError> {
        Ok(match self.outputs.as_slice() {
            [] => Returned::Nothing,
            [(_, value)] => Returned::Single(value.clone()),
            many => Returned::Tuple(many.iter().map(|(_, v)| v.clone()).collect()),
        })
    }
}

pub struct ConstantFactory;

impl OperationFactory for ConstantFactory {
    fn create(&self, config: &HashMap<String, Value>) -> Result<Arc<dyn Operation>, OperationError> {
        Ok(Arc::new(Constant::new(config.clone())))
    }

    fn kind(&self) -> &str {
        "source.constant"
    }

    fn metadata(&self) -> OperationMetadata {
        OperationMetadata {
            description: "Emit every config entry as a named output".to_string(),
            category: "source".to_string(),
        }
    }
}

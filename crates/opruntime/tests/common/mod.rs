#![allow(dead_code)]

use async_trait::async_trait;
use opcore::{
    DataType, Operation, OperationContext, OperationError, Returned, Signature, Value,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Every call made to a recorder: its label and the inputs it received
pub type CallLog = Arc<Mutex<Vec<(String, HashMap<String, Value>)>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn labels(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().iter().map(|(label, _)| label.clone()).collect()
}

pub fn inputs_of(log: &CallLog, label: &str) -> HashMap<String, Value> {
    log.lock()
        .unwrap()
        .iter()
        .find(|(l, _)| l == label)
        .map(|(_, inputs)| inputs.clone())
        .unwrap_or_else(|| panic!("{} was never called", label))
}

pub fn inputs(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Counts operations running at the same time and remembers the peak
#[derive(Clone, Default)]
pub struct Gauge {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gauge {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Test operation with a configurable contract and a canned return
pub struct Recorder {
    label: String,
    signature: Signature,
    returns: Result<Returned, OperationError>,
    delay: Option<Duration>,
    gauge: Option<Gauge>,
    panics: bool,
    log: CallLog,
}

impl Recorder {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            signature: Signature::new(),
            returns: Ok(Returned::Nothing),
            delay: None,
            gauge: None,
            panics: false,
            log: Arc::clone(log),
        }
    }

    pub fn input(mut self, name: &str, data_type: DataType) -> Self {
        self.signature = self.signature.with_input(name, data_type);
        self
    }

    pub fn output(mut self, name: &str, data_type: DataType) -> Self {
        self.signature = self.signature.with_output(name, data_type);
        self
    }

    pub fn returning(mut self, returned: Returned) -> Self {
        self.returns = Ok(returned);
        self
    }

    pub fn failing(mut self, error: OperationError) -> Self {
        self.returns = Err(error);
        self
    }

    /// Sleep before returning, giving up early if the run is cancelled
    pub fn sleeping(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Count this operation in `gauge` while it runs
    pub fn gauged(mut self, gauge: &Gauge) -> Self {
        self.gauge = Some(gauge.clone());
        self
    }

    /// Panic instead of returning
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn shared(self) -> Arc<dyn Operation> {
        Arc::new(self)
    }
}

#[async_trait]
impl Operation for Recorder {
    fn kind(&self) -> &str {
        &self.label
    }

    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    async fn run(&self, ctx: OperationContext) -> Result<Returned, OperationError> {
        if self.panics {
            panic!("{} blew up", self.label);
        }
        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        let cancelled = match self.delay {
            Some(delay) => tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = ctx.cancellation.cancelled() => true,
            },
            None => false,
        };
        if let Some(gauge) = &self.gauge {
            gauge.leave();
        }
        if cancelled {
            return Err(OperationError::Cancelled);
        }
        self.log
            .lock()
            .unwrap()
            .push((self.label.clone(), ctx.inputs.clone()));
        self.returns.clone()
    }
}

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

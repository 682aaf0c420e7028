//! Shared test helpers: a scripted PLC driver and a recording sink

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use plc_link::{
    ConnectionMetadata, DriverManager, PlcConnection, PlcDriver, PlcError, ReadRequest,
    ReadRequestBuilder, ReadResponse,
};
use plcsrv::config::connection_url;
use plcsrv::mapping::{build_fields, FieldConfig, MetricConfig};
use plcsrv::{Metric, MetricSink, PollTarget, Schema, Session};
use tokio_util::sync::CancellationToken;

/// What the next `execute` call does
#[derive(Debug, Clone)]
pub enum Step {
    Respond,
    Fail(&'static str),
    /// Never completes on its own; a spawned watcher records when the token fires
    Hang,
}

/// Shared knobs and counters of the scripted driver
#[derive(Debug, Default)]
pub struct MockState {
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub builds: AtomicUsize,
    pub executes: AtomicUsize,
    pub connect_failures: AtomicUsize,
    /// Number of upcoming connects that never complete
    pub connect_hangs: AtomicUsize,
    /// Tokens seen cancelled by work spawned from `execute`
    pub cancels_seen: AtomicUsize,
    pub write_only: AtomicBool,
    pub build_error: Mutex<Option<String>>,
    pub steps: Mutex<VecDeque<Step>>,
    pub response: Mutex<ReadResponse>,
}

impl MockState {
    pub fn script(&self, steps: impl IntoIterator<Item = Step>) {
        self.steps.lock().unwrap().extend(steps);
    }

    pub fn set_response(&self, response: ReadResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MockDriver {
    code: String,
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new(code: &str, state: Arc<MockState>) -> Self {
        Self {
            code: code.to_string(),
            state,
        }
    }
}

#[async_trait]
impl PlcDriver for MockDriver {
    fn protocol_code(&self) -> &str {
        &self.code
    }

    async fn connect(&self, url: &str) -> plc_link::Result<Box<dyn PlcConnection>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let pending_hangs = self.state.connect_hangs.load(Ordering::SeqCst);
        if pending_hangs > 0 {
            self.state
                .connect_hangs
                .store(pending_hangs - 1, Ordering::SeqCst);
            std::future::pending::<()>().await;
        }
        let pending_failures = self.state.connect_failures.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.state
                .connect_failures
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(PlcError::connection("connection refused"));
        }
        Ok(Box::new(MockConnection {
            url: url.to_string(),
            state: Arc::clone(&self.state),
            open: true,
        }))
    }
}

struct MockConnection {
    url: String,
    state: Arc<MockState>,
    open: bool,
}

#[async_trait]
impl PlcConnection for MockConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn metadata(&self) -> ConnectionMetadata {
        if self.state.write_only.load(Ordering::SeqCst) {
            ConnectionMetadata {
                can_read: false,
                can_write: true,
                can_subscribe: false,
            }
        } else {
            ConnectionMetadata::read_only()
        }
    }

    fn is_connected(&self) -> bool {
        self.open
    }

    fn read_request_builder(&self) -> plc_link::Result<Box<dyn ReadRequestBuilder>> {
        Ok(Box::new(MockBuilder {
            state: Arc::clone(&self.state),
            tags: Vec::new(),
        }))
    }

    async fn close(&mut self) -> plc_link::Result<()> {
        if self.open {
            self.open = false;
            self.state.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct MockBuilder {
    state: Arc<MockState>,
    tags: Vec<String>,
}

impl ReadRequestBuilder for MockBuilder {
    fn add_tag_address(&mut self, name: &str, _address: &str) {
        self.tags.push(name.to_string());
    }

    fn build(self: Box<Self>) -> plc_link::Result<Box<dyn ReadRequest>> {
        self.state.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.state.build_error.lock().unwrap().clone() {
            return Err(PlcError::build(reason));
        }
        Ok(Box::new(MockRequest {
            state: self.state,
            tags: self.tags,
        }))
    }
}

struct MockRequest {
    state: Arc<MockState>,
    tags: Vec<String>,
}

#[async_trait]
impl ReadRequest for MockRequest {
    fn tag_names(&self) -> Vec<String> {
        self.tags.clone()
    }

    async fn execute(&self, cancel: CancellationToken) -> plc_link::Result<ReadResponse> {
        self.state.executes.fetch_add(1, Ordering::SeqCst);
        let step = self
            .state
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Respond);

        match step {
            Step::Respond => Ok(self.state.response.lock().unwrap().clone()),
            Step::Fail(reason) => Err(PlcError::execution(reason)),
            Step::Hang => {
                let watcher = cancel.clone();
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    watcher.cancelled().await;
                    state.cancels_seen.fetch_add(1, Ordering::SeqCst);
                });

                tokio::select! {
                    _ = cancel.cancelled() => Err(PlcError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_secs(3600)) => {
                        Ok(self.state.response.lock().unwrap().clone())
                    },
                }
            },
        }
    }
}

/// Sink that keeps every emitted batch
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub batches: Arc<Mutex<Vec<Vec<Metric>>>>,
}

impl RecordingSink {
    pub fn batches(&self) -> Vec<Vec<Metric>> {
        self.batches.lock().unwrap().clone()
    }
}

impl MetricSink for RecordingSink {
    fn emit(&mut self, metrics: &[Metric]) -> plcsrv::Result<()> {
        self.batches.lock().unwrap().push(metrics.to_vec());
        Ok(())
    }
}

/// One metric block `m{unit=1}` with the given (field, address) pairs
pub fn unit_metric(fields: &[(&str, &str)]) -> MetricConfig {
    MetricConfig {
        name: "m".into(),
        tags: BTreeMap::from([("unit".to_string(), "1".to_string())]),
        fields: fields
            .iter()
            .map(|(name, address)| FieldConfig {
                name: name.to_string(),
                address: address.to_string(),
            })
            .collect(),
    }
}

pub fn target(metrics: &[MetricConfig], timeout: Duration) -> PollTarget {
    PollTarget {
        schema: Schema::S7,
        url: connection_url(Schema::S7, "plc", &[]),
        timeout,
        fields: build_fields(metrics).unwrap(),
    }
}

/// Session against a scripted `s7` driver
pub fn mock_session(metrics: &[MetricConfig], timeout: Duration) -> (Session, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let mut manager = DriverManager::new();
    manager.register(Arc::new(MockDriver::new("s7", Arc::clone(&state))));
    (Session::new(manager, target(metrics, timeout)), state)
}

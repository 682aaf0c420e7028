//! Poll scheduler
//!
//! Drives the session at a fixed interval and forwards every cycle's metrics
//! to the sink. Cycles never overlap: the next tick is awaited only after the
//! previous cycle finished, and late ticks are skipped.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::session::Session;
use crate::sink::MetricSink;

pub struct Poller {
    session: Session,
    sink: Box<dyn MetricSink>,
    interval: Duration,
}

impl Poller {
    pub fn new(session: Session, sink: Box<dyn MetricSink>, interval: Duration) -> Self {
        Self {
            session,
            sink,
            interval,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Connect and build the read request; any error here is fatal
    pub async fn start(&mut self) -> Result<()> {
        self.session.establish().await?;
        let target = self.session.target();
        info!(
            "Polling {} every {:?} ({} fields, timeout {:?})",
            target.url,
            self.interval,
            target.fields.len(),
            target.timeout
        );
        Ok(())
    }

    /// Run a single cycle and emit its metrics, returning how many were emitted
    pub async fn poll_once(&mut self) -> Result<usize> {
        let metrics = self.session.execute_cycle().await?;
        self.sink.emit(&metrics)?;
        Ok(metrics.len())
    }

    /// Poll until `cancel` fires or a fatal error occurs, then shut the session down
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                _ = ticker.tick() => {},
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                result = self.poll_once() => result,
            };

            match result {
                Ok(count) => debug!("Cycle emitted {} metrics", count),
                Err(e) if e.is_fatal() => {
                    error!("Polling stopped: {}", e);
                    break Err(e);
                },
                Err(e) if e.is_timeout() => warn!("Cycle skipped: {}", e),
                Err(e) => error!("Cycle failed: {}", e),
            }
        };

        self.shutdown().await;
        outcome
    }

    pub async fn shutdown(&mut self) {
        self.session.shutdown().await;
    }
}

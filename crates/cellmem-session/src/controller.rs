//! Session Controller: wires boundary events to the accountant and the
//! sampler.
//!
//! ```text
//!   Stopped --start--> Armed --interval start--> InInterval
//!      ^                 ^  <---interval end----     |
//!      +------stop-------+----------stop-------------+
//! ```
//!
//! The end callback cancels the sampler and proceeds without waiting for
//! it, so the final readings may be taken a tick before the sampler's last
//! update lands.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;

use cellmem_core::config::LoggerConfig;
use cellmem_core::error::Result;
use cellmem_core::id::{IntervalId, SubscriptionId};
use cellmem_core::probe::Backends;
use cellmem_core::types::Snapshot;
use cellmem_sampler::{PeakTracker, SamplerConfig, SamplerHandle};

use crate::accountant::Accountant;
use crate::events::{BoundaryHooks, BoundarySource};
use crate::metrics;
use crate::report::{IntervalReport, ReportFormat, ReportSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Stopped,
    Armed,
    InInterval,
}

struct Inner {
    state: SessionState,
    accountant: Accountant,
    sampler: Option<SamplerHandle>,
    subscription: Option<SubscriptionId>,
    last_id: IntervalId,
    last_report: Option<IntervalReport>,
}

pub struct Session {
    config: LoggerConfig,
    sampler_cfg: SamplerConfig,
    backends: Backends,
    source: Arc<dyn BoundarySource>,
    sink: Arc<dyn ReportSink>,
    inner: Mutex<Inner>,
}

/// What the event source holds: a weak link, so a forgotten `stop()` does
/// not keep the session alive through the source.
struct SessionHooks(Weak<Session>);

impl BoundaryHooks for SessionHooks {
    fn on_interval_start(&self) {
        if let Some(s) = self.0.upgrade() {
            s.on_interval_start();
        }
    }

    fn on_interval_end(&self) {
        if let Some(s) = self.0.upgrade() {
            s.on_interval_end();
        }
    }
}

impl Session {
    /// Validate `config` and take the initial readings.
    pub fn new(
        config: LoggerConfig,
        backends: Backends,
        source: Arc<dyn BoundarySource>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let accountant = Accountant::new(backends.clone(), config.reclaim_before_reading);
        Ok(Arc::new(Self {
            sampler_cfg: SamplerConfig::from_logger(&config),
            config,
            backends,
            source,
            sink,
            inner: Mutex::new(Inner {
                state: SessionState::Stopped,
                accountant,
                sampler: None,
                subscription: None,
                last_id: IntervalId::new(0),
                last_report: None,
            }),
        }))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Subscribe to the boundary source. No-op unless `Stopped`.
    pub fn start(self: &Arc<Self>) {
        let mut inner = self.lock();
        if inner.state != SessionState::Stopped {
            return;
        }
        let hooks: Arc<dyn BoundaryHooks> = Arc::new(SessionHooks(Arc::downgrade(self)));
        inner.subscription = Some(self.source.subscribe(hooks));
        inner.state = SessionState::Armed;
        tracing::debug!("cellmem session armed");
    }

    /// Unsubscribe and signal any in-flight sampler. Never fails.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.state == SessionState::Stopped {
            return;
        }
        if let Some(id) = inner.subscription.take() {
            if let Err(e) = self.source.unsubscribe(id) {
                tracing::debug!(error = %e, "ignoring unsubscribe failure");
            }
        }
        if let Some(sampler) = inner.sampler.take() {
            sampler.cancel();
        }
        inner.state = SessionState::Stopped;
        tracing::debug!("cellmem session stopped");
    }

    pub fn on_interval_start(&self) {
        let mut inner = self.lock();
        match inner.state {
            SessionState::Stopped => return,
            SessionState::InInterval => {
                // Last writer wins: the stale run is signalled and forgotten.
                tracing::debug!("interval start while already in an interval; restarting sampler");
                if let Some(old) = inner.sampler.take() {
                    old.cancel();
                }
            }
            SessionState::Armed => {}
        }

        // The start timestamp must exist before the sampler's first tick.
        inner.accountant.begin_interval();
        let tracker = Arc::new(PeakTracker::new());
        inner.sampler = Some(SamplerHandle::spawn(
            tracker,
            self.backends.clone(),
            self.sampler_cfg,
        ));
        inner.state = SessionState::InInterval;
    }

    pub fn on_interval_end(&self) {
        let report = {
            let mut inner = self.lock();
            if inner.state != SessionState::InInterval {
                tracing::debug!(state = ?inner.state, "interval end outside an interval; ignored");
                return;
            }
            let Some(sampler) = inner.sampler.take() else {
                inner.state = SessionState::Armed;
                return;
            };
            sampler.cancel();

            let snapshot = inner.accountant.end_interval(sampler.tracker());
            let id = inner.last_id.next();
            let report = IntervalReport {
                id,
                snapshot,
                sample_ticks: sampler.iterations(),
                runaway: sampler.hit_ceiling(),
            };
            inner.last_id = id;
            inner.last_report = Some(report.clone());
            inner.state = SessionState::Armed;
            report
        };

        metrics::emit_interval(&report);
        self.sink.emit(&report, self.format());
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() != SessionState::Stopped
    }

    /// Latest snapshot; before the first interval, the initial readings
    /// with zero deltas.
    pub fn data(&self) -> Snapshot {
        self.lock().accountant.snapshot()
    }

    pub fn last_report(&self) -> Option<IntervalReport> {
        self.lock().last_report.clone()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn format(&self) -> ReportFormat {
        ReportFormat::from_compact(self.config.compact)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(sampler) = inner.sampler.take() {
            sampler.cancel();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("backends", &self.backends)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

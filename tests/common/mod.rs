//! Shared helpers for the session integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cellmem_core::config::LoggerConfig;
use cellmem_core::probe::Backends;
use cellmem_probe::ManualProbe;
use cellmem_session::{CollectingSink, HookRegistry, Session};

pub struct Harness {
    pub session: Arc<Session>,
    pub registry: Arc<HookRegistry>,
    pub sink: CollectingSink,
    pub host: ManualProbe,
    pub device: Option<ManualProbe>,
}

pub fn config() -> LoggerConfig {
    LoggerConfig {
        reclaim_before_reading: false,
        ..LoggerConfig::default()
    }
}

pub fn harness(cfg: LoggerConfig, host_mb: u64, device_mb: Option<u64>) -> Harness {
    let host = ManualProbe::new(host_mb);
    let device = device_mb.map(ManualProbe::new);
    let backends = match &device {
        Some(d) => Backends::new(Arc::new(host.clone()), Arc::new(d.clone())),
        None => Backends::host_only(Arc::new(host.clone())),
    };
    let registry = Arc::new(HookRegistry::new());
    let sink = CollectingSink::new();
    let session = Session::new(cfg, backends, registry.clone(), Arc::new(sink.clone()))
        .expect("valid config");
    session.start();
    Harness {
        session,
        registry,
        sink,
        host,
        device,
    }
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Block until `reads` has advanced by two, so at least one full sampler
/// tick started and finished after the caller's last `set`.
pub fn wait_for_ticks(reads: impl Fn() -> u64) {
    let start = reads();
    assert!(
        wait_until(Duration::from_secs(5), || reads() >= start + 2),
        "sampler never ticked"
    );
}

//! Human-readable and machine-readable interval reports.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use cellmem_core::id::IntervalId;
use cellmem_core::types::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `Gen: d/p/u MB | GPU: d/p/u MB | Time t | (Consumed/Peaked/Used Total)`
    Compact,
    /// Three-line table.
    Verbose,
}

impl ReportFormat {
    pub fn from_compact(compact: bool) -> Self {
        if compact {
            ReportFormat::Compact
        } else {
            ReportFormat::Verbose
        }
    }
}

/// Everything known about one completed interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalReport {
    pub id: IntervalId,
    pub snapshot: Snapshot,
    /// Sampler ticks completed before the end boundary.
    pub sample_ticks: u64,
    /// The sampler hit its ceiling; peaks may be understated.
    pub runaway: bool,
}

impl IntervalReport {
    pub fn render(&self, format: ReportFormat) -> String {
        render(&self.snapshot, format)
    }
}

fn cell(v: Option<i64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

pub fn render(s: &Snapshot, format: ReportFormat) -> String {
    match format {
        ReportFormat::Compact => format!(
            "Gen: {}/{}/{} MB | GPU: {}/{}/{} MB | Time {:.3}s | (Consumed/Peaked/Used Total)",
            cell(s.gen_mem_used_delta),
            cell(s.gen_mem_peaked),
            cell(s.gen_mem_used),
            cell(s.gpu_mem_used_delta),
            cell(s.gpu_mem_peaked),
            cell(s.gpu_mem_used),
            s.time_delta,
        ),
        ReportFormat::Verbose => format!(
            "RAM: Consumed Peaked  Used Total | Exec time {:.3}s\n\
             Gen:    {:>5}  {:>5}    {:>5} MB |\n\
             GPU:    {:>5}  {:>5}    {:>5} MB |",
            s.time_delta,
            cell(s.gen_mem_used_delta),
            cell(s.gen_mem_peaked),
            cell(s.gen_mem_used),
            cell(s.gpu_mem_used_delta),
            cell(s.gpu_mem_peaked),
            cell(s.gpu_mem_used),
        ),
    }
}

/// Destination for completed-interval reports. Must not fail the caller.
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &IntervalReport, format: ReportFormat);
}

/// Prints the rendered report to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn emit(&self, report: &IntervalReport, format: ReportFormat) {
        println!("{}", report.render(format));
    }
}

/// Keeps every report in memory for programmatic consumers.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    reports: Arc<Mutex<Vec<IntervalReport>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<IntervalReport> {
        self.reports
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<IntervalReport> {
        self.reports
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .last()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for CollectingSink {
    fn emit(&self, report: &IntervalReport, _format: ReportFormat) {
        self.reports
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(report.clone());
    }
}

/// One JSON object per line. Write errors are logged and dropped.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}

impl<W: Write + Send> ReportSink for JsonLinesSink<W> {
    fn emit(&self, report: &IntervalReport, _format: ReportFormat) {
        let line = match serde_json::to_string(report) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "could not serialize interval report");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(|p| p.into_inner());
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "could not write interval report");
        }
    }
}

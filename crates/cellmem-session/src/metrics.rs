//! Tracing hooks for completed intervals.
//!
//! No telemetry stack is pulled in here; wire a subscriber (OpenTelemetry,
//! Prometheus bridge, ...) in the binary layer.

use crate::report::IntervalReport;

/// Flatten a report into `(key, value)` pairs. Unavailable metrics are skipped.
pub fn key_values(report: &IntervalReport) -> Vec<(&'static str, String)> {
    let s = &report.snapshot;
    let mut kv = Vec::with_capacity(9);
    let fields = [
        ("gen_mem_used_delta", s.gen_mem_used_delta),
        ("gen_mem_peaked", s.gen_mem_peaked),
        ("gen_mem_used", s.gen_mem_used),
        ("gpu_mem_used_delta", s.gpu_mem_used_delta),
        ("gpu_mem_peaked", s.gpu_mem_peaked),
        ("gpu_mem_used", s.gpu_mem_used),
    ];
    for (k, v) in fields {
        if let Some(v) = v {
            kv.push((k, v.to_string()));
        }
    }
    kv.push(("time_delta", format!("{:.6}", s.time_delta)));
    kv.push(("sample_ticks", report.sample_ticks.to_string()));
    kv
}

pub fn emit_interval(report: &IntervalReport) {
    let span = tracing::trace_span!("cellmem", interval = report.id.get());
    let _entered = span.enter();
    for (k, v) in key_values(report) {
        tracing::trace!(%k, %v, "metric");
    }
    if report.runaway {
        tracing::warn!(
            interval = report.id.get(),
            "interval outlived the sampler ceiling; reported peaks may be low"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellmem_core::id::IntervalId;
    use cellmem_core::types::Snapshot;

    #[test]
    fn unavailable_metrics_are_skipped() {
        let report = IntervalReport {
            id: IntervalId::new(1),
            snapshot: Snapshot {
                gen_mem_used_delta: Some(1),
                gen_mem_peaked: Some(0),
                gen_mem_used: Some(50),
                gpu_mem_used_delta: None,
                gpu_mem_peaked: None,
                gpu_mem_used: None,
                time_delta: 0.5,
            },
            sample_ticks: 4,
            runaway: false,
        };
        let kv = key_values(&report);
        let keys: Vec<&str> = kv.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                "gen_mem_used_delta",
                "gen_mem_peaked",
                "gen_mem_used",
                "time_delta",
                "sample_ticks"
            ]
        );
        assert_eq!(kv[3].1, "0.500000");
    }
}

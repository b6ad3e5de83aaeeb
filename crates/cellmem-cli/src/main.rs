//! cellmem CLI: per-command memory reports for an interactive session.

mod repl;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cellmem_core::config::LoggerConfig;
use cellmem_probe::{accelerator, ProcessRssProbe};

#[derive(Parser)]
#[command(name = "cellmem")]
#[command(about = "Host and accelerator memory logger for interactive sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one host/device memory reading for this process
    Probe {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Read commands from stdin, one monitored interval per line
    ///
    /// Commands: `alloc <mb>`, `spike <mb> [hold_ms]`, `free`, `sleep <ms>`, `quit`.
    Repl(ReplArgs),
}

#[derive(Args, Debug, Default)]
struct ReplArgs {
    /// YAML config file (defaults, then env, are used when absent)
    #[arg(long)]
    config: Option<PathBuf>,

    /// One-line reports
    #[arg(long)]
    compact: bool,

    /// Skip reclamation before final readings (use when tracking leaks)
    #[arg(long)]
    no_reclaim: bool,

    /// Sampler poll interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Runaway ceiling for one sampler run, in seconds
    #[arg(long)]
    max_sample_seconds: Option<f64>,

    /// Emit one JSON report per line instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Probe { json } => run_probe(json),
        Commands::Repl(args) => run_repl(&args),
    };
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_probe(json: bool) -> Result<()> {
    init_accelerator();
    let host = ProcessRssProbe::current().context("resolve current process")?;
    let backends = accelerator::backends(Arc::new(host));

    let host_mb = backends.host.used_mb().ok();
    let device_mb = backends.device.as_ref().and_then(|d| d.used_mb().ok());

    if json {
        let v = serde_json::json!({ "host_mb": host_mb, "device_mb": device_mb });
        println!("{v}");
    } else {
        let show = |v: Option<u64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v} MB"));
        println!("Gen: {}", show(host_mb));
        println!("GPU: {}", show(device_mb));
    }
    Ok(())
}

fn run_repl(args: &ReplArgs) -> Result<()> {
    let config = resolve_config(args)?;
    tracing::debug!(?config, "starting repl");
    init_accelerator();
    let host = ProcessRssProbe::current().context("resolve current process")?;
    let backends = accelerator::backends(Arc::new(host));
    repl::run(config, backends, args.json)
}

#[cfg(feature = "nvml")]
fn init_accelerator() {
    use cellmem_core::probe::DeviceProbe;
    use cellmem_probe::NvmlProbe;

    let device = match NvmlProbe::new() {
        Ok(probe) => Some(Arc::new(probe) as Arc<dyn DeviceProbe>),
        Err(e) => {
            tracing::info!(error = %e, "no NVML device; device metrics unavailable");
            None
        }
    };
    accelerator::init(device);
}

#[cfg(not(feature = "nvml"))]
fn init_accelerator() {
    accelerator::init(None);
}

fn resolve_config(args: &ReplArgs) -> Result<LoggerConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            LoggerConfig::from_yaml_str(&text)?
        }
        None => LoggerConfig::from_env(),
    };
    apply_overrides(&mut cfg, args);
    cfg.validate()?;
    Ok(cfg)
}

fn apply_overrides(cfg: &mut LoggerConfig, args: &ReplArgs) {
    if args.compact {
        cfg.compact = true;
    }
    if args.no_reclaim {
        cfg.reclaim_before_reading = false;
    }
    if let Some(ms) = args.poll_interval_ms {
        cfg.poll_interval_ms = ms;
    }
    if let Some(s) = args.max_sample_seconds {
        cfg.max_sample_seconds = s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let mut cfg = LoggerConfig::from_yaml_str("compact: false\npoll_interval_ms: 10\n").unwrap();
        let args = ReplArgs {
            compact: true,
            no_reclaim: true,
            poll_interval_ms: Some(2),
            ..Default::default()
        };
        apply_overrides(&mut cfg, &args);
        assert!(cfg.compact);
        assert!(!cfg.reclaim_before_reading);
        assert_eq!(cfg.poll_interval_ms, 2);
        assert_eq!(cfg.max_sample_seconds, 60.0);
    }

    #[test]
    fn cli_parses_repl_flags() {
        let cli = Cli::try_parse_from([
            "cellmem",
            "repl",
            "--compact",
            "--max-sample-seconds",
            "2.5",
        ])
        .unwrap();
        match cli.command {
            Commands::Repl(args) => {
                assert!(args.compact);
                assert_eq!(args.max_sample_seconds, Some(2.5));
            }
            _ => panic!("expected repl"),
        }
    }
}

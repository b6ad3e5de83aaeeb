//! Line-oriented demo host: each stdin line is one monitored interval.

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use cellmem_core::config::LoggerConfig;
use cellmem_core::probe::Backends;
use cellmem_session::{HookRegistry, JsonLinesSink, ReportSink, Session, StdoutSink};

const MB: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Allocate and keep `mb`.
    Alloc(usize),
    /// Allocate `mb`, hold it for `hold_ms`, release it.
    Spike { mb: usize, hold_ms: u64 },
    /// Drop everything retained by `alloc`.
    Free,
    Sleep(u64),
    Quit,
}

pub fn parse_command(line: &str) -> std::result::Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let mut num = |what: &str| -> std::result::Result<u64, String> {
        parts
            .next()
            .ok_or_else(|| format!("`{verb}` needs {what}"))?
            .parse::<u64>()
            .map_err(|e| format!("bad {what}: {e}"))
    };
    let mut size = || -> std::result::Result<usize, String> {
        let mb = num("a size in MB")?;
        usize::try_from(mb)
            .ok()
            .filter(|mb| mb.checked_mul(MB).is_some())
            .ok_or_else(|| format!("size {mb} MB is too large for this platform"))
    };
    let cmd = match verb {
        "alloc" => Command::Alloc(size()?),
        "spike" => {
            let mb = size()?;
            let hold_ms = num("a hold time in ms").unwrap_or(50);
            Command::Spike { mb, hold_ms }
        }
        "free" => Command::Free,
        "sleep" => Command::Sleep(num("a duration in ms")?),
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command `{other}`")),
    };
    Ok(Some(cmd))
}

#[derive(Default)]
struct Workspace {
    retained: Vec<Vec<u8>>,
}

/// Allocate `mb` MB filled with a non-zero byte so every page is touched.
/// Allocation failure is reported instead of aborting the process.
fn touched_buffer(mb: usize) -> std::result::Result<Vec<u8>, String> {
    let len = mb
        .checked_mul(MB)
        .ok_or_else(|| format!("size {mb} MB overflows"))?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| format!("cannot allocate {mb} MB: {e}"))?;
    buf.resize(len, 1u8);
    Ok(buf)
}

impl Workspace {
    fn apply(&mut self, cmd: Command) -> std::result::Result<(), String> {
        match cmd {
            Command::Alloc(mb) => self.retained.push(touched_buffer(mb)?),
            Command::Spike { mb, hold_ms } => {
                let buf = touched_buffer(mb)?;
                thread::sleep(Duration::from_millis(hold_ms));
                drop(buf);
            }
            Command::Free => self.retained.clear(),
            Command::Sleep(ms) => thread::sleep(Duration::from_millis(ms)),
            Command::Quit => {}
        }
        Ok(())
    }
}

pub fn run(config: LoggerConfig, backends: Backends, json: bool) -> Result<()> {
    let registry = Arc::new(HookRegistry::new());
    let sink: Arc<dyn ReportSink> = if json {
        Arc::new(JsonLinesSink::new(io::stdout()))
    } else {
        Arc::new(StdoutSink)
    };
    let session = Session::new(config, backends, registry.clone(), sink)?;
    session.start();

    let mut ws = Workspace::default();
    for line in io::stdin().lock().lines() {
        let line = line?;
        match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Quit)) => break,
            Ok(Some(cmd)) => {
                if let Err(e) = registry.run_cell(|| ws.apply(cmd)) {
                    eprintln!("{e}");
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }

    session.stop();
    Ok(())
}

//! Process resident-set-size probe.

use std::sync::Mutex;

use sysinfo::{Pid, ProcessesToUpdate, System};

use cellmem_core::error::{Error, Result};
use cellmem_core::probe::HostProbe;

const MB: u64 = 1 << 20;

/// RSS of one process in MB, rounded down.
///
/// `System` is kept between calls so the sampler only refreshes one pid per
/// tick instead of rebuilding the process table.
pub struct ProcessRssProbe {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessRssProbe {
    /// Probe the calling process.
    pub fn current() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| Error::host_unavailable(e))?;
        Ok(Self::for_pid(pid))
    }

    pub fn for_pid(pid: Pid) -> Self {
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }
}

impl HostProbe for ProcessRssProbe {
    fn used_mb(&self) -> Result<u64> {
        let mut sys = self
            .system
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sys.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = sys
            .process(self.pid)
            .ok_or_else(|| Error::host_unavailable(format!("process {} not found", self.pid)))?;
        Ok(process.memory() / MB)
    }
}

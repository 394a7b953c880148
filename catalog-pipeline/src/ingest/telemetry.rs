//! Process memory sampling for ingestion telemetry.

use sysinfo::{Pid, System};

/// Samples the resident memory of the current process.
pub struct MemorySampler {
    system: System,
    pid: Option<Pid>,
    hostname: String,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        }
    }

    /// Host name the samples are recorded under.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Current resident memory in bytes, or 0 when the platform does not report it.
    pub fn sample(&mut self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        if !self.system.refresh_process(pid) {
            return 0;
        }
        self.system
            .process(pid)
            .map(|process| process.memory())
            .unwrap_or(0)
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostname_is_never_empty() {
        let sampler = MemorySampler::new();
        assert!(!sampler.hostname().is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sample_reports_own_process() {
        let mut sampler = MemorySampler::new();
        assert!(sampler.pid.is_some());
        assert!(sampler.sample() > 0);
    }
}

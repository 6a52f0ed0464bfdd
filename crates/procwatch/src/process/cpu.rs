use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, Pid, ProcessRefreshKind, System};
use tracing::{debug, trace};

use crate::config::CpuSource;

/// Point-in-time CPU utilisation for a single process.
///
/// Samplers are shared across the worker threads of one refresh cycle, so
/// they must be `Sync`. A sample that cannot be taken is `0.0`, never an
/// error.
pub trait CpuSampler: Send + Sync {
    /// Called once before the per-process samples of a refresh cycle.
    fn begin_cycle(&self) {}

    fn sample_cpu(&self, pid: u32) -> f64;
}

pub fn sampler_for(source: CpuSource) -> Box<dyn CpuSampler> {
    match source {
        CpuSource::Ps => Box::new(PsSampler),
        CpuSource::Sysinfo => Box::new(SysinfoSampler::new()),
    }
}

/// Asks `ps` for the `%cpu` column of one pid. One child process per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PsSampler;

impl CpuSampler for PsSampler {
    fn sample_cpu(&self, pid: u32) -> f64 {
        let output = Command::new("ps")
            .args(["-p", &pid.to_string(), "-o", "%cpu="])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                parse_cpu_output(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                trace!(pid, status = %output.status, "ps reported no such process");
                0.0
            }
            Err(err) => {
                debug!(pid, %err, "failed to run ps");
                0.0
            }
        }
    }
}

/// Parses the last non-empty line of an accounting utility's output.
pub fn parse_cpu_output(output: &str) -> f64 {
    output
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .map(normalize_cpu)
        .unwrap_or(0.0)
}

fn normalize_cpu(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

struct SysinfoState {
    system: System,
    last_refresh: Option<Instant>,
}

/// In-process sampler backed by `sysinfo`. Usage is the delta between two
/// refreshes spaced at least sysinfo's minimum CPU update interval apart;
/// the first cycle primes the counters and waits out that interval.
pub struct SysinfoSampler {
    state: Mutex<SysinfoState>,
    process_refresh: ProcessRefreshKind,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SysinfoState {
                system: System::new(),
                last_refresh: None,
            }),
            process_refresh: ProcessRefreshKind::new().with_cpu(),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSampler for SysinfoSampler {
    fn begin_cycle(&self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let last_refresh = state.last_refresh;
        let wait = match last_refresh {
            None => {
                state
                    .system
                    .refresh_processes_specifics(self.process_refresh);
                MINIMUM_CPU_UPDATE_INTERVAL
            }
            Some(at) => MINIMUM_CPU_UPDATE_INTERVAL.saturating_sub(at.elapsed()),
        };
        if !wait.is_zero() {
            thread::sleep(wait);
        }
        state
            .system
            .refresh_processes_specifics(self.process_refresh);
        state.last_refresh = Some(Instant::now());
    }

    fn sample_cpu(&self, pid: u32) -> f64 {
        let Ok(state) = self.state.lock() else {
            return 0.0;
        };
        state
            .system
            .process(Pid::from_u32(pid))
            .map(|process| normalize_cpu(f64::from(process.cpu_usage())))
            .unwrap_or(0.0)
    }
}

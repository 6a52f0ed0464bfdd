use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid as NixPid;
use tracing::{debug, info};

/// Sends termination requests. Delivery is fire-and-forget: the outcome only
/// shows up as a changed process table on a later refresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessController;

impl ProcessController {
    pub fn new() -> Self {
        Self
    }

    /// Requests a graceful shutdown (SIGTERM) of `pid`. Missing processes and
    /// permission failures are logged, never returned.
    pub fn terminate(&self, pid: u32) {
        if is_protected(pid) {
            debug!(pid, "refusing to signal protected pid");
            return;
        }

        match kill(NixPid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => info!(pid, "sent SIGTERM"),
            Err(Errno::ESRCH) => debug!(pid, "SIGTERM target already gone"),
            Err(Errno::EPERM) => debug!(pid, "SIGTERM not permitted"),
            Err(err) => debug!(pid, %err, "SIGTERM failed"),
        }
    }
}

/// Pids `terminate` never signals: 0 and anything beyond `i32::MAX` would
/// address process groups, and our own pid would leave the terminal raw.
pub fn is_protected(pid: u32) -> bool {
    pid == 0 || pid > i32::MAX as u32 || pid == std::process::id()
}

use std::os::unix::process::ExitStatusExt;
use std::process::Command;

use procwatch::config::SortKey;
use procwatch::process::{AttributeReader, CpuSampler, ProcessSource, SnapshotBuilder};
use procwatch::signals::ProcessController;

struct IdleSampler;

impl CpuSampler for IdleSampler {
    fn sample_cpu(&self, _pid: u32) -> f64 {
        0.0
    }
}

#[test]
fn test_proc_lists_current_process() {
    let current = std::process::id();
    let found = ProcessSource::default()
        .list_candidates()
        .unwrap()
        .any(|pid| pid == current);
    assert!(found, "current process should be enumerated");
}

#[test]
fn test_reads_own_status() {
    let attrs = AttributeReader::default()
        .read_attributes(std::process::id())
        .unwrap();
    assert!(!attrs.name.is_empty());
    assert!(attrs.mem_usage.ends_with("kB"));
}

#[test]
fn test_refresh_against_proc_is_bounded() {
    let snapshot = SnapshotBuilder::new("/proc", Box::new(IdleSampler))
        .with_capacity(5)
        .refresh(SortKey::Pid)
        .unwrap();
    assert!(snapshot.len() <= 5);
    assert!(snapshot.iter().all(|record| record.pid > 0));
}

#[test]
fn test_full_refresh_includes_current_process() {
    let snapshot = SnapshotBuilder::new("/proc", Box::new(IdleSampler))
        .with_capacity(usize::MAX)
        .refresh(SortKey::Pid)
        .unwrap();
    let current = std::process::id();
    assert!(snapshot.iter().any(|record| record.pid == current));
}

#[test]
fn test_terminate_sends_sigterm() {
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    ProcessController::new().terminate(child.id());
    let status = child.wait().unwrap();
    assert_eq!(status.signal(), Some(15));
}

#[test]
fn test_terminate_missing_pid_is_silent() {
    let pid_max: u32 = std::fs::read_to_string("/proc/sys/kernel/pid_max")
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    // the kernel never hands out pids at or above pid_max
    ProcessController::new().terminate(pid_max);
    ProcessController::new().terminate(i32::MAX as u32);
}

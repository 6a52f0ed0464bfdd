use std::cmp::Ordering;

use crate::config::SortKey;
use crate::process::{ProcessRecord, Snapshot};

/// Orders a snapshot ascending by `key`. Every key falls back to the pid, so
/// the order is total and sorting twice changes nothing.
pub fn sort(mut snapshot: Snapshot, key: SortKey) -> Snapshot {
    snapshot
        .records_mut()
        .sort_by(|a, b| compare(a, b, key));
    snapshot
}

pub fn compare(a: &ProcessRecord, b: &ProcessRecord, key: SortKey) -> Ordering {
    let ordering = match key {
        SortKey::Pid => Ordering::Equal,
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Mem => memory_bytes(&a.mem_usage)
            .cmp(&memory_bytes(&b.mem_usage))
            .then_with(|| a.mem_usage.cmp(&b.mem_usage)),
        SortKey::Cpu => a.cpu_usage.total_cmp(&b.cpu_usage),
    };
    ordering.then_with(|| a.pid.cmp(&b.pid))
}

/// Size in bytes of a status-file memory value such as `"11904 kB"`.
/// `None` for empty or unrecognised text, which orders before any size.
pub fn memory_bytes(text: &str) -> Option<u64> {
    let mut parts = text.split_whitespace();
    let amount = parts.next()?.parse::<u64>().ok()?;
    let scale = match parts.next() {
        None => 1,
        Some(unit) => match unit.to_ascii_lowercase().as_str() {
            "b" => 1,
            "kb" => 1 << 10,
            "mb" => 1 << 20,
            "gb" => 1 << 30,
            _ => return None,
        },
    };
    Some(amount.saturating_mul(scale))
}

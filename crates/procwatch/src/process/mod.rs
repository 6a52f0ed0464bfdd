//! Process snapshot pipeline: enumerate the registry, read per-process
//! attributes, sample CPU and assemble one ordered [`Snapshot`] per cycle.

use chrono::{DateTime, Local};

pub mod attributes;
pub mod cpu;
pub mod snapshot;
pub mod sort;
pub mod source;

pub use attributes::{AttributeReader, ProcessAttributes};
pub use cpu::{CpuSampler, PsSampler, SysinfoSampler, sampler_for};
pub use snapshot::SnapshotBuilder;
pub use sort::sort;
pub use source::{Candidates, ProcessSource};

/// Maximum number of records a snapshot holds unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRecord {
    pub pid: u32,
    /// empty when the status file carried no `Name` line.
    pub name: String,
    /// raw `VmSize` text, units included (e.g. `"1234 kB"`).
    pub mem_usage: String,
    pub cpu_usage: f64,
}

/// One refresh cycle's worth of records. Built fresh every cycle; nothing
/// links it to the previous one.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: Vec<ProcessRecord>,
    captured_at: DateTime<Local>,
}

impl Snapshot {
    pub fn new(records: Vec<ProcessRecord>) -> Self {
        Self {
            records,
            captured_at: Local::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProcessRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[ProcessRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProcessRecord> {
        self.records.iter()
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn pids(&self) -> Vec<u32> {
        self.records.iter().map(|record| record.pid).collect()
    }

    /// Same records, last to first.
    pub fn reversed(mut self) -> Self {
        self.records.reverse();
        self
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<ProcessRecord> {
        &mut self.records
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a ProcessRecord;
    type IntoIter = std::slice::Iter<'a, ProcessRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

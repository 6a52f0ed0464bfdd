use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::{Config, SortKey};
use crate::process::{
    AttributeReader, CpuSampler, DEFAULT_CAPACITY, ProcessAttributes, ProcessRecord,
    ProcessSource, Snapshot, sampler_for, sort,
};

/// Runs one refresh cycle: enumerate, read attributes, sample CPU, sort.
///
/// At most `capacity` records are admitted per cycle because every CPU
/// sample may cost a child process. Sampling the admitted records is spread
/// over at most `jobs` scoped threads.
pub struct SnapshotBuilder {
    source: ProcessSource,
    reader: AttributeReader,
    sampler: Box<dyn CpuSampler>,
    capacity: usize,
    jobs: usize,
}

impl SnapshotBuilder {
    pub fn new(root: impl Into<PathBuf>, sampler: Box<dyn CpuSampler>) -> Self {
        let root = root.into();
        Self {
            source: ProcessSource::new(root.clone()),
            reader: AttributeReader::new(root),
            sampler,
            capacity: DEFAULT_CAPACITY,
            jobs: 1,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.proc_root.clone(), sampler_for(config.cpu_source))
            .with_capacity(config.capacity)
            .with_jobs(config.jobs)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Builds a complete snapshot ordered by `sort_key`. The only error is an
    /// unreadable registry; processes that vanish mid-cycle are skipped and
    /// failed CPU samples read as `0.0`.
    pub fn refresh(&self, sort_key: SortKey) -> Result<Snapshot> {
        let started = Instant::now();
        let candidates = self
            .source
            .list_candidates()
            .inspect_err(|err| warn!("{err:#}"))?;

        // the bound can be far larger than the registry
        let mut admitted = Vec::with_capacity(self.capacity.min(DEFAULT_CAPACITY));
        let mut scanned = 0usize;
        let mut vanished = 0usize;
        for pid in candidates {
            if admitted.len() >= self.capacity {
                break;
            }
            scanned += 1;
            match self.reader.read_attributes(pid) {
                Some(attributes) => admitted.push((pid, attributes)),
                None => vanished += 1,
            }
        }

        self.sampler.begin_cycle();
        let records = self.assemble(admitted);

        debug!(
            scanned,
            vanished,
            admitted = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "refresh cycle complete"
        );
        Ok(sort(Snapshot::new(records), sort_key))
    }

    fn assemble(&self, admitted: Vec<(u32, ProcessAttributes)>) -> Vec<ProcessRecord> {
        let cpu = self.sample_all(&admitted);
        admitted
            .into_iter()
            .zip(cpu)
            .map(|((pid, attributes), cpu_usage)| ProcessRecord {
                pid,
                name: attributes.name,
                mem_usage: attributes.mem_usage,
                cpu_usage,
            })
            .collect()
    }

    fn sample_all(&self, admitted: &[(u32, ProcessAttributes)]) -> Vec<f64> {
        let sampler = self.sampler.as_ref();
        if self.jobs == 1 || admitted.len() <= 1 {
            return admitted
                .iter()
                .map(|(pid, _)| sampler.sample_cpu(*pid))
                .collect();
        }

        let chunk_size = admitted.len().div_ceil(self.jobs);
        thread::scope(|scope| {
            let workers: Vec<_> = admitted
                .chunks(chunk_size)
                .map(|chunk| {
                    let handle = scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|(pid, _)| sampler.sample_cpu(*pid))
                            .collect::<Vec<f64>>()
                    });
                    (chunk.len(), handle)
                })
                .collect();

            workers
                .into_iter()
                .flat_map(|(len, handle)| handle.join().unwrap_or_else(|_| vec![0.0; len]))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::TempDir;

    use super::*;

    #[derive(Default)]
    struct CountingSampler {
        calls: Arc<AtomicUsize>,
    }

    impl CpuSampler for CountingSampler {
        fn sample_cpu(&self, pid: u32) -> f64 {
            self.calls.fetch_add(1, Ordering::SeqCst);
            f64::from(pid % 7)
        }
    }

    fn registry(pids: &[u32]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for pid in pids {
            let proc_dir = dir.path().join(pid.to_string());
            fs::create_dir(&proc_dir).unwrap();
            fs::write(
                proc_dir.join("status"),
                format!("Name:\tproc{pid}\nVmSize:\t {} kB\n", pid * 10),
            )
            .unwrap();
        }
        dir
    }

    #[test]
    fn samples_only_admitted_records() {
        let pids: Vec<u32> = (1..=30).collect();
        let dir = registry(&pids);
        let calls = Arc::new(AtomicUsize::new(0));
        let sampler = Box::new(CountingSampler {
            calls: Arc::clone(&calls),
        });
        let builder = SnapshotBuilder::new(dir.path(), sampler).with_capacity(10);
        let snapshot = builder.refresh(SortKey::Pid).unwrap();
        assert_eq!(snapshot.len(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn parallel_sampling_matches_sequential() {
        let pids: Vec<u32> = (1..=23).collect();
        let dir = registry(&pids);
        let sequential = SnapshotBuilder::new(
            dir.path(),
            Box::new(CountingSampler::default()),
        )
        .refresh(SortKey::Pid)
        .unwrap();
        let parallel = SnapshotBuilder::new(
            dir.path(),
            Box::new(CountingSampler::default()),
        )
        .with_jobs(4)
        .refresh(SortKey::Pid)
        .unwrap();
        assert_eq!(sequential.records(), parallel.records());
        for record in parallel.iter() {
            assert_eq!(record.cpu_usage, f64::from(record.pid % 7));
        }
    }

    #[test]
    fn zero_capacity_still_admits_one() {
        let dir = registry(&[5, 6]);
        let builder = SnapshotBuilder::new(
            dir.path(),
            Box::new(CountingSampler::default()),
        )
        .with_capacity(0);
        assert_eq!(builder.capacity(), 1);
        assert_eq!(builder.refresh(SortKey::Pid).unwrap().len(), 1);
    }

    #[test]
    fn huge_capacity_admits_whole_small_registry() {
        let dir = registry(&[1, 2, 3]);
        let builder = SnapshotBuilder::new(dir.path(), Box::new(CountingSampler::default()))
            .with_capacity(usize::MAX);
        assert_eq!(builder.refresh(SortKey::Pid).unwrap().pids(), vec![1, 2, 3]);
    }
}

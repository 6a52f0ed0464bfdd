use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// The OS process registry: a directory holding one numerically named
/// entry per live process.
#[derive(Debug, Clone)]
pub struct ProcessSource {
    root: PathBuf,
}

impl ProcessSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Opens the registry and returns a lazy, single-pass iterator over the
    /// pids it holds right now. Failing to open the registry is the only
    /// error; entries that cannot be read mid-walk are skipped.
    pub fn list_candidates(&self) -> Result<Candidates> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("cannot open process registry {}", self.root.display()))?;
        Ok(Candidates { entries })
    }
}

impl Default for ProcessSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

pub struct Candidates {
    entries: ReadDir,
}

impl Iterator for Candidates {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        for entry in self.entries.by_ref() {
            let Ok(entry) = entry else {
                continue;
            };
            if let Some(pid) = entry.file_name().to_str().and_then(parse_pid) {
                return Some(pid);
            }
        }
        None
    }
}

/// Accepts only names made entirely of ASCII digits that denote a positive
/// pid. Control entries such as `self` or `sys` are rejected.
pub fn parse_pid(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<u32>().ok().filter(|pid| *pid > 0)
}

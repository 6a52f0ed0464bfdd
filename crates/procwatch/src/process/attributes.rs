use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use tracing::trace;

const NAME_LABEL: &str = "Name:";
const MEMORY_LABEL: &str = "VmSize:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessAttributes {
    pub name: String,
    pub mem_usage: String,
}

/// Reads the label-prefixed `status` file under `<root>/<pid>/`.
#[derive(Debug, Clone)]
pub struct AttributeReader {
    root: PathBuf,
}

impl AttributeReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `None` when the status file cannot be opened, which in practice means
    /// the process exited after it was enumerated. Callers skip the pid for
    /// this cycle. Missing labels come back as empty strings.
    pub fn read_attributes(&self, pid: u32) -> Option<ProcessAttributes> {
        let path = self.root.join(pid.to_string()).join("status");
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                trace!(pid, %err, "status unavailable, process vanished");
                return None;
            }
        };
        Some(parse_status(BufReader::new(file)))
    }
}

impl Default for AttributeReader {
    fn default() -> Self {
        Self::new("/proc")
    }
}

/// Single pass over the status lines; the first occurrence of each label
/// wins. A read error part way through keeps whatever was found so far.
pub fn parse_status(reader: impl BufRead) -> ProcessAttributes {
    let mut name = None;
    let mut mem_usage = None;

    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if name.is_none() {
            if let Some(value) = line.strip_prefix(NAME_LABEL) {
                name = Some(value.trim().to_string());
                continue;
            }
        }
        if mem_usage.is_none() {
            if let Some(value) = line.strip_prefix(MEMORY_LABEL) {
                mem_usage = Some(value.trim().to_string());
            }
        }
        if name.is_some() && mem_usage.is_some() {
            break;
        }
    }

    ProcessAttributes {
        name: name.unwrap_or_default(),
        mem_usage: mem_usage.unwrap_or_default(),
    }
}

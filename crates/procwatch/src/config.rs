use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use ratatui::style::Color;

use crate::process::DEFAULT_CAPACITY;

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum Theme {
    Pink,
    Serious,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Pink
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub table_header: Color,
    pub table_border: Color,
    pub text_normal: Color,
    pub text_dim: Color,
    pub highlight_selected: Color,
    pub cpu_hot: Color,
    pub status_info: Color,
    pub status_warning: Color,
    pub status_error: Color,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Pink => Palette {
                table_header: Color::Rgb(255, 121, 198),
                table_border: Color::Rgb(189, 147, 249),
                text_normal: Color::Rgb(248, 248, 242),
                text_dim: Color::Rgb(98, 114, 164),
                highlight_selected: Color::Rgb(68, 71, 90),
                cpu_hot: Color::Rgb(255, 85, 85),
                status_info: Color::Rgb(139, 233, 253),
                status_warning: Color::Rgb(241, 250, 140),
                status_error: Color::Rgb(255, 85, 85),
            },
            Theme::Serious => Palette {
                table_header: Color::White,
                table_border: Color::Gray,
                text_normal: Color::White,
                text_dim: Color::DarkGray,
                highlight_selected: Color::Blue,
                cpu_hot: Color::Red,
                status_info: Color::Cyan,
                status_warning: Color::Yellow,
                status_error: Color::Red,
            },
        }
    }
}

/// Ordering applied to every snapshot. Survives refresh cycles and only
/// changes on an explicit user command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum SortKey {
    Pid,
    Name,
    Mem,
    Cpu,
}

impl Default for SortKey {
    fn default() -> Self {
        SortKey::Pid
    }
}

impl SortKey {
    pub fn display_name(self) -> &'static str {
        match self {
            SortKey::Pid => "PID",
            SortKey::Name => "Name",
            SortKey::Mem => "Memory",
            SortKey::Cpu => "CPU",
        }
    }
}

/// Backend used to take per-process CPU samples.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum CpuSource {
    /// one `ps` invocation per process per cycle.
    Ps,
    /// in-process accounting, delta between two refresh cycles.
    Sysinfo,
}

impl Default for CpuSource {
    fn default() -> Self {
        CpuSource::Ps
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub proc_root: PathBuf,
    pub capacity: usize,
    pub jobs: usize,
    pub cpu_source: CpuSource,
    pub refresh_rate_ms: u64,
    pub initial_sort: SortKey,
    pub sort_descending: bool,
}

impl Config {
    /// `None` means refresh only in response to input.
    pub fn refresh_interval(&self) -> Option<Duration> {
        if self.refresh_rate_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.refresh_rate_ms))
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            proc_root: PathBuf::from("/proc"),
            capacity: DEFAULT_CAPACITY,
            jobs: 4,
            cpu_source: CpuSource::default(),
            refresh_rate_ms: 2_000,
            initial_sort: SortKey::default(),
            sort_descending: false,
        }
    }
}

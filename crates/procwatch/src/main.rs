use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::info;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{fmt, prelude::*};

use procwatch::app::App;
use procwatch::config::{Config, CpuSource, SortKey, Theme};
use procwatch::process::{Snapshot, SnapshotBuilder};
use procwatch::ui;

#[derive(Debug, Parser)]
#[command(name = "procwatch", about = "Interactive terminal process monitor", version)]
pub struct Cli {
    /// column used to sort the process table.
    #[arg(long = "sort-by", value_enum, default_value_t = SortKey::Pid)]
    pub sort_by: SortKey,

    /// show the sorted table highest first.
    #[arg(long = "reverse")]
    pub reverse: bool,

    /// maximum number of processes sampled per refresh.
    #[arg(short = 'n', long = "limit", default_value_t = 100,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// refresh interval in milliseconds, 0 refreshes only on input.
    #[arg(long = "refresh-rate", value_name = "ms", default_value_t = 2_000)]
    pub refresh_rate: u64,

    /// where cpu percentages come from.
    #[arg(long = "cpu-source", value_enum, default_value_t = CpuSource::Ps)]
    pub cpu_source: CpuSource,

    /// worker threads used for cpu sampling.
    #[arg(short = 'j', long = "jobs", default_value_t = 4,
          value_parser = clap::value_parser!(u32).range(1..=64))]
    pub jobs: u32,

    /// root of the process registry.
    #[arg(long = "proc-root", default_value = "/proc", hide = true)]
    pub proc_root: PathBuf,

    /// theme selection for the tui.
    #[arg(long = "theme", value_enum, default_value_t = Theme::Pink)]
    pub theme: Theme,

    /// print a single snapshot and exit.
    #[arg(long = "once")]
    pub once: bool,

    /// minimum log level.
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    /// append logs to this file; the tui logs nowhere otherwise.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            theme: self.theme,
            proc_root: self.proc_root.clone(),
            capacity: self.limit as usize,
            jobs: self.jobs as usize,
            cpu_source: self.cpu_source,
            refresh_rate_ms: self.refresh_rate,
            initial_sort: self.sort_by,
            sort_descending: self.reverse,
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args)?;
    let config = args.config();
    info!(?config, "starting procwatch");

    if args.once {
        print_once(&config)
    } else {
        run_tui(config)
    }
}

fn init_tracing(args: &Cli) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(args.log_level.into());

    if let Some(path) = &args.log_file {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .with(filter)
            .init();
    } else if args.once {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
    }
    Ok(())
}

fn print_once(config: &Config) -> Result<()> {
    let builder = SnapshotBuilder::from_config(config);
    let mut snapshot = builder.refresh(config.initial_sort)?;
    if config.sort_descending {
        snapshot = snapshot.reversed();
    }

    let mut out = io::stdout().lock();
    write_table(&mut out, &snapshot)?;
    out.flush()?;
    Ok(())
}

fn write_table(out: &mut impl Write, snapshot: &Snapshot) -> io::Result<()> {
    writeln!(out, "{:>8}  {:<24}  {:>6}  MEMORY", "PID", "NAME", "CPU%")?;
    for record in snapshot {
        writeln!(
            out,
            "{:>8}  {:<24}  {:>6.2}  {}",
            record.pid, record.name, record.cpu_usage, record.mem_usage
        )?;
    }
    Ok(())
}

fn run_tui(config: Config) -> Result<()> {
    let mut app = App::new(config);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err).context("failed to enter alternate screen");
    }

    let result = Terminal::new(CrosstermBackend::new(stdout))
        .context("failed to create terminal")
        .and_then(|mut terminal| {
            let outcome = event_loop(&mut terminal, &mut app);
            let _ = terminal.show_cursor();
            outcome
        });

    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    info!("procwatch exiting");
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let ready = match app.time_until_refresh() {
            Some(timeout) => event::poll(timeout)?,
            None => true,
        };
        if ready {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_input(key)? {
                    return Ok(());
                }
            }
        }

        if app.refresh_due() {
            app.refresh();
        }
    }
}

#[cfg(test)]
mod tests {
    use procwatch::process::ProcessRecord;

    use super::*;

    #[test]
    fn cli_defaults_match_config_defaults() {
        let args = Cli::parse_from(["procwatch"]);
        let config = args.config();
        let defaults = Config::default();
        assert_eq!(config.capacity, defaults.capacity);
        assert_eq!(config.jobs, defaults.jobs);
        assert_eq!(config.initial_sort, defaults.initial_sort);
        assert_eq!(config.refresh_rate_ms, defaults.refresh_rate_ms);
        assert_eq!(config.cpu_source, defaults.cpu_source);
        assert_eq!(config.proc_root, defaults.proc_root);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(Cli::try_parse_from(["procwatch", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["procwatch", "-j", "0"]).is_err());
    }

    #[test]
    fn flags_reach_config() {
        let args = Cli::parse_from([
            "procwatch",
            "--sort-by",
            "cpu",
            "--reverse",
            "-n",
            "25",
            "--cpu-source",
            "sysinfo",
            "--refresh-rate",
            "0",
        ]);
        let config = args.config();
        assert_eq!(config.initial_sort, SortKey::Cpu);
        assert!(config.sort_descending);
        assert_eq!(config.capacity, 25);
        assert_eq!(config.cpu_source, CpuSource::Sysinfo);
        assert_eq!(config.refresh_interval(), None);
    }

    #[test]
    fn once_table_lists_every_record() {
        let snapshot = Snapshot::new(vec![ProcessRecord {
            pid: 7,
            name: "init".to_string(),
            mem_usage: "1024 kB".to_string(),
            cpu_usage: 0.5,
        }]);
        let mut out = Vec::new();
        write_table(&mut out, &snapshot).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("PID"));
        assert!(lines[1].contains("init"));
        assert!(lines[1].contains("0.50"));
        assert!(lines[1].ends_with("1024 kB"));
    }
}

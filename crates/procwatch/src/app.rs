use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::{Config, SortKey, Theme};
use crate::process::{ProcessRecord, Snapshot, SnapshotBuilder, sort};
use crate::signals::{ProcessController, is_protected};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Row index into the current snapshot. Moves never wrap.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Cursor {
    index: usize,
}

impl Cursor {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(self) -> usize {
        self.index
    }

    /// Pulls the cursor back inside `[0, len - 1]`; an empty snapshot parks
    /// it at 0.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.index = 0;
        } else if self.index >= len {
            self.index = len - 1;
        }
    }

    pub fn up(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn down(&mut self, len: usize) {
        if self.index + 1 < len {
            self.index += 1;
        }
    }

    pub fn top(&mut self) {
        self.index = 0;
    }

    pub fn bottom(&mut self, len: usize) {
        self.index = len.saturating_sub(1);
    }
}

pub struct App {
    snapshot: Snapshot,
    cursor: Cursor,
    sort_key: SortKey,
    sort_descending: bool,

    theme: Theme,
    refresh_interval: Option<Duration>,
    last_refresh: Instant,

    status_message: Option<(String, StatusLevel)>,
    table_scroll_offset: usize,

    builder: SnapshotBuilder,
    controller: ProcessController,
}

impl App {
    pub fn new(config: Config) -> Self {
        let builder = SnapshotBuilder::from_config(&config);
        Self::with_builder(&config, builder)
    }

    pub fn with_builder(config: &Config, builder: SnapshotBuilder) -> Self {
        let mut app = Self {
            snapshot: Snapshot::empty(),
            cursor: Cursor::default(),
            sort_key: config.initial_sort,
            sort_descending: config.sort_descending,
            theme: config.theme,
            refresh_interval: config.refresh_interval(),
            last_refresh: Instant::now(),
            status_message: None,
            table_scroll_offset: 0,
            builder,
            controller: ProcessController::new(),
        };
        app.refresh();
        app
    }

    /// Replaces the snapshot with a freshly built one. An unreadable
    /// registry leaves an empty list and an error status; the next cycle
    /// tries again.
    pub fn refresh(&mut self) {
        match self.builder.refresh(self.sort_key) {
            Ok(snapshot) => {
                self.snapshot = self.apply_order(snapshot);
                if matches!(self.status_message, Some((_, StatusLevel::Error))) {
                    self.status_message = None;
                }
            }
            Err(err) => {
                self.snapshot = Snapshot::empty();
                self.set_status(StatusLevel::Error, format!("{err:#}"));
            }
        }
        self.last_refresh = Instant::now();
        self.clamp_cursor();
    }

    /// Time left before the periodic refresh, `None` when refreshing only on
    /// input.
    pub fn time_until_refresh(&self) -> Option<Duration> {
        self.refresh_interval
            .map(|interval| interval.saturating_sub(self.last_refresh.elapsed()))
    }

    pub fn refresh_due(&self) -> bool {
        self.time_until_refresh()
            .is_some_and(|remaining| remaining.is_zero())
    }

    /// Applies one key press. Returns `true` when the monitor should exit.
    /// Without a refresh interval every handled key also resamples, unless
    /// the key already did.
    pub fn handle_input(&mut self, event: KeyEvent) -> Result<bool> {
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(matches!(event.code, KeyCode::Char('c')));
        }

        let refreshed_at = self.last_refresh;
        match event.code {
            KeyCode::F(10) | KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up | KeyCode::Char('k') => self.cursor.up(),
            KeyCode::Down | KeyCode::Char('j') => self.cursor.down(self.snapshot.len()),
            KeyCode::Home | KeyCode::Char('g') => self.cursor.top(),
            KeyCode::End | KeyCode::Char('G') => self.cursor.bottom(self.snapshot.len()),
            KeyCode::F(5) | KeyCode::Char('p') => self.set_sort_key(SortKey::Pid),
            KeyCode::F(6) | KeyCode::Char('n') => self.set_sort_key(SortKey::Name),
            KeyCode::F(7) | KeyCode::Char('c') => self.set_sort_key(SortKey::Cpu),
            KeyCode::F(8) | KeyCode::Char('m') => self.set_sort_key(SortKey::Mem),
            KeyCode::Char('r') => self.toggle_order(),
            KeyCode::F(9) | KeyCode::Delete => self.terminate_selected(),
            KeyCode::F(2) | KeyCode::Char(' ') => self.refresh(),
            _ => {}
        }

        if self.refresh_interval.is_none() && self.last_refresh == refreshed_at {
            self.refresh();
        }
        Ok(false)
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
        self.resort();
        let message = format!(
            "sorting by {} {}",
            key.display_name(),
            order_text(self.sort_descending)
        );
        self.set_status(StatusLevel::Info, message);
    }

    pub fn toggle_order(&mut self) {
        self.sort_descending = !self.sort_descending;
        self.resort();
        let message = format!(
            "sorting by {} {}",
            self.sort_key.display_name(),
            order_text(self.sort_descending)
        );
        self.set_status(StatusLevel::Info, message);
    }

    pub fn terminate_selected(&mut self) {
        let Some(target) = self.selected().cloned() else {
            self.set_status(StatusLevel::Warning, "no process selected");
            return;
        };

        if is_protected(target.pid) {
            let message = format!("refusing to signal {} ({})", target.name, target.pid);
            self.set_status(StatusLevel::Warning, message);
            return;
        }

        self.controller.terminate(target.pid);
        let message = format!(
            "sent SIGTERM to {} ({}) at {}",
            target.name,
            target.pid,
            Local::now().format("%H:%M:%S")
        );
        self.set_status(StatusLevel::Info, message);
        self.refresh();
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn selected(&self) -> Option<&ProcessRecord> {
        self.snapshot.get(self.cursor.index())
    }

    pub fn selected_index(&self) -> usize {
        self.cursor.index()
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn sort_descending(&self) -> bool {
        self.sort_descending
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn capacity(&self) -> usize {
        self.builder.capacity()
    }

    pub fn status_message(&self) -> Option<&(String, StatusLevel)> {
        self.status_message.as_ref()
    }

    pub fn table_scroll_offset(&self) -> usize {
        self.table_scroll_offset
    }

    pub fn set_table_scroll_offset(&mut self, offset: usize) {
        self.table_scroll_offset = offset;
    }

    fn resort(&mut self) {
        let snapshot = std::mem::take(&mut self.snapshot);
        self.snapshot = self.apply_order(sort(snapshot, self.sort_key));
    }

    fn apply_order(&self, snapshot: Snapshot) -> Snapshot {
        if self.sort_descending {
            snapshot.reversed()
        } else {
            snapshot
        }
    }

    fn clamp_cursor(&mut self) {
        self.cursor.clamp(self.snapshot.len());
        if let Some(last) = self.snapshot.len().checked_sub(1) {
            self.table_scroll_offset = self.table_scroll_offset.min(last);
        } else {
            self.table_scroll_offset = 0;
        }
    }

    fn set_status<T: Into<String>>(&mut self, level: StatusLevel, message: T) {
        self.status_message = Some((message.into(), level));
    }
}

pub fn order_text(desc: bool) -> &'static str {
    if desc { "(desc)" } else { "(asc)" }
}

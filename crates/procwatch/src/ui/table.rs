use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::prelude::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table,
};

use crate::app::{App, StatusLevel, order_text};
use crate::config::Palette;
use crate::process::ProcessRecord;

const NAME_WIDTH: usize = 24;
const HOT_CPU_PERCENT: f64 = 50.0;
const HINTS: &str =
    "↑↓ move | F5 pid | F6 name | F7 cpu | F8 mem | r order | F9 kill | F2 refresh | F10 quit";

pub fn render(frame: &mut Frame, area: Rect, app: &mut App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(area);

    render_header(frame, layout[0], app);
    render_process_list(frame, layout[1], app);
    render_status(frame, layout[2], app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let palette = app.theme().palette();
    let snapshot = app.snapshot();
    let spans = vec![
        Span::styled(
            "procwatch",
            Style::default()
                .fg(palette.table_header)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            format!(
                "sort: {} {}",
                app.sort_key().display_name(),
                order_text(app.sort_descending())
            ),
            Style::default().fg(palette.text_normal),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("{}/{} processes", snapshot.len(), app.capacity()),
            Style::default().fg(palette.text_dim),
        ),
        Span::raw(" | "),
        Span::styled(
            snapshot.captured_at().format("%H:%M:%S").to_string(),
            Style::default().fg(palette.text_dim),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_process_list(frame: &mut Frame, area: Rect, app: &mut App) {
    let palette = app.theme().palette();
    let row_count = app.snapshot().len();
    let visible_height = area.height.saturating_sub(3) as usize; // borders + header
    let selected_index = app.selected_index();

    let offset = scroll_offset(selected_index, app.table_scroll_offset(), visible_height);
    app.set_table_scroll_offset(offset);

    let displayed = app
        .snapshot()
        .records()
        .get(offset..offset.saturating_add(visible_height).min(row_count))
        .unwrap_or_default();

    let header_cells = ["", "PID", "NAME", "CPU%", "MEMORY"]
        .into_iter()
        .map(|title| Cell::from(title).style(Style::default().fg(palette.table_header)));
    let header = Row::new(header_cells).height(1);

    let rows = displayed.iter().enumerate().map(|(idx, record)| {
        build_row(&palette, record, idx + offset == selected_index)
    });

    let widths = [
        Constraint::Length(1),
        Constraint::Length(8),
        Constraint::Length(NAME_WIDTH as u16),
        Constraint::Length(7),
        Constraint::Min(10),
    ];

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.table_border));
    if row_count == 0 {
        block = block.title(Span::styled(
            " no processes ",
            Style::default().fg(palette.text_dim),
        ));
    }

    let table = Table::new(rows, widths)
        .block(block)
        .header(header)
        .column_spacing(1);

    frame.render_widget(table, area);

    if row_count > visible_height && visible_height > 0 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None)
            .track_symbol(Some("░"))
            .thumb_symbol("█")
            .style(Style::default().fg(palette.table_border));
        // one position per possible offset
        let mut state = ScrollbarState::new(row_count - visible_height + 1)
            .viewport_content_length(visible_height)
            .position(offset);
        let track = area.inner(&Margin {
            vertical: 1,
            horizontal: 0,
        });
        frame.render_stateful_widget(scrollbar, track, &mut state);
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let palette = app.theme().palette();
    let mut lines = vec![Line::from(""), Line::from("")];

    if let Some((message, level)) = app.status_message() {
        let color = match level {
            StatusLevel::Info => palette.status_info,
            StatusLevel::Warning => palette.status_warning,
            StatusLevel::Error => palette.status_error,
        };
        lines[0] = Line::from(Span::styled(message.clone(), Style::default().fg(color)));
    }

    lines[1] = Line::from(Span::styled(HINTS, Style::default().fg(palette.text_dim)));

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(palette.table_border));

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn build_row(palette: &Palette, record: &ProcessRecord, is_selected: bool) -> Row<'static> {
    let mut style = Style::default().fg(palette.text_normal);
    if is_selected {
        style = style
            .bg(palette.highlight_selected)
            .add_modifier(Modifier::BOLD);
    }

    let marker = if is_selected { ">" } else { " " };
    let cpu_color = if record.cpu_usage >= HOT_CPU_PERCENT {
        palette.cpu_hot
    } else {
        palette.text_normal
    };

    Row::new(vec![
        Cell::from(marker),
        Cell::from(format!("{:>8}", record.pid)),
        Cell::from(fit_name(&record.name, NAME_WIDTH)),
        Cell::from(format!("{:>6.2}", record.cpu_usage)).style(Style::default().fg(cpu_color)),
        Cell::from(record.mem_usage.clone()),
    ])
    .style(style)
    .height(1)
}

/// First visible row so that `selected` stays inside a window of `height`.
fn scroll_offset(selected: usize, current: usize, height: usize) -> usize {
    if height == 0 {
        0
    } else if selected >= current + height {
        selected + 1 - height
    } else if selected < current {
        selected
    } else {
        current
    }
}

/// Cuts `name` to `width` columns, marking the cut with an ellipsis.
fn fit_name(name: &str, width: usize) -> String {
    match name.char_indices().nth(width) {
        None => name.to_string(),
        Some(_) => {
            let cut = name
                .char_indices()
                .nth(width.saturating_sub(1))
                .map_or(0, |(at, _)| at);
            format!("{}…", &name[..cut])
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::*;

    #[test]
    fn offset_follows_cursor_down_and_up() {
        assert_eq!(scroll_offset(0, 0, 10), 0);
        assert_eq!(scroll_offset(12, 0, 10), 3);
        assert_eq!(scroll_offset(2, 3, 10), 2);
        assert_eq!(scroll_offset(5, 3, 10), 3);
        assert_eq!(scroll_offset(5, 3, 0), 0);
    }

    #[test]
    fn long_names_are_cut_with_ellipsis() {
        assert_eq!(fit_name("short", 8), "short");
        assert_eq!(fit_name("exactly8", 8), "exactly8");
        assert_eq!(fit_name("much-too-long", 8), "much-to…");
        assert_eq!(fit_name("kworker/ü:1H-events", 10), "kworker/ü…");
    }

    struct IdleSampler;

    impl crate::process::CpuSampler for IdleSampler {
        fn sample_cpu(&self, _pid: u32) -> f64 {
            0.0
        }
    }

    fn app_with(processes: u32) -> (tempfile::TempDir, App) {
        let dir = tempfile::TempDir::new().unwrap();
        for pid in 1..=processes {
            let entry = dir.path().join(pid.to_string());
            std::fs::create_dir(&entry).unwrap();
            let status = format!("Name:\tworker{pid}\nVmSize:\t 64 kB\n");
            std::fs::write(entry.join("status"), status).unwrap();
        }
        let config = crate::config::Config {
            proc_root: dir.path().to_path_buf(),
            refresh_rate_ms: 60_000,
            ..crate::config::Config::default()
        };
        let builder = crate::process::SnapshotBuilder::new(dir.path(), Box::new(IdleSampler));
        let app = App::with_builder(&config, builder);
        (dir, app)
    }

    fn column(terminal: &Terminal<TestBackend>, x: u16) -> String {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| buffer.get(x, y).symbol().to_string())
            .collect()
    }

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer.get(x, y).symbol())
                    .collect::<String>()
                    + "\n"
            })
            .collect()
    }

    #[test]
    fn renders_empty_app_without_panicking() {
        let (_dir, mut app) = app_with(0);
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        terminal.draw(|frame| crate::ui::render(frame, &mut app)).unwrap();
        assert!(screen(&terminal).contains("no processes"));
        assert!(!column(&terminal, 79).contains('█'));
    }

    #[test]
    fn long_list_scrolls_with_cursor_and_shows_scrollbar() {
        let (_dir, mut app) = app_with(30);
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();

        terminal.draw(|frame| crate::ui::render(frame, &mut app)).unwrap();
        let track = column(&terminal, 79);
        assert!(track.contains('█'));
        assert!(track.contains('░'));
        assert!(screen(&terminal).contains("worker1 "));
        assert!(!screen(&terminal).contains("worker30"));

        app.handle_input(crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::End,
            crossterm::event::KeyModifiers::NONE,
        ))
        .unwrap();
        terminal.draw(|frame| crate::ui::render(frame, &mut app)).unwrap();
        let text = screen(&terminal);
        assert!(text.contains("worker30"));
        assert!(!text.contains("worker1 "));
        assert_eq!(app.table_scroll_offset(), 30 - 6);
        // thumb sits at the bottom of the track once the last page shows
        let track: Vec<char> = column(&terminal, 79).chars().collect();
        assert_eq!(track[8], '█');
        assert_eq!(track[2], '░');
    }
}

use ratatui::Frame;

use crate::app::App;

pub mod table;

pub fn render(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.size();
    table::render(frame, area, app);
}

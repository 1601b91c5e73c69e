//! Main UI rendering coordinator.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::Paragraph,
};

use super::app::{App, Mode, Tab};
use super::components::{status_bar, tab_bar};
use super::tabs::{cart, catalog, orders};

/// Renders the entire application UI.
pub fn render(frame: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Length(1), // Status bar
            Constraint::Min(8),    // Tab body
            Constraint::Length(1), // Keybindings help
        ])
        .split(frame.area());

    tab_bar::render(frame, layout[0], app);
    status_bar::render(frame, layout[1], app);

    match app.current_tab() {
        Tab::Catalog => catalog::render(frame, layout[2], app),
        Tab::Cart => cart::render(frame, layout[2], app),
        Tab::Orders => orders::render(frame, layout[2], app),
    }

    render_keybindings(frame, layout[3], app);
}

fn render_keybindings(frame: &mut Frame, area: Rect, app: &App) {
    let help = match (app.mode, app.current_tab()) {
        (Mode::Insert, _) => "Enter:save  Esc:cancel  Tab:next field",
        (Mode::Normal, Tab::Catalog) => "j/k:move  a:add to cart  r:reload  t:delivery/pickup  Tab:next  q:quit",
        (Mode::Normal, Tab::Cart) => {
            "j/k:move  +/-:qty  d:remove  n:note  h/l:cart/form  i:edit  p:promo  t:delivery/pickup  s:place order"
        }
        (Mode::Normal, Tab::Orders) => "/:track order  j/k:move  Enter:show receipt  Tab:next  q:quit",
    };
    let para = Paragraph::new(Line::from(help)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(para, area);
}

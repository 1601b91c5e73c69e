//! Status bar component.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::pricing::format_rupees;
use crate::tui::app::{App, CatalogStatus, ToastLevel};

/// Renders the status bar: catalog state, order type, cart badge and
/// total, submission state, and the current toast.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let (catalog_label, catalog_color) = match app.catalog_status {
        CatalogStatus::Loading => (" Loading catalog ", Color::Yellow),
        CatalogStatus::Ready => (" Catalog ready ", Color::Green),
        CatalogStatus::Failed(_) => (" Catalog offline ", Color::Red),
    };

    let storefront = &app.storefront;
    let mut spans = vec![
        Span::styled(catalog_label, Style::default().fg(catalog_color)),
        Span::raw("│"),
        Span::styled(
            format!(" {} ", storefront.order_type()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("│"),
        Span::styled(
            format!(
                " Cart: {} │ {} ",
                storefront.badge_count(),
                format_rupees(storefront.totals().total)
            ),
            Style::default().fg(Color::White),
        ),
    ];

    if let Some(order_id) = storefront.in_flight() {
        spans.push(Span::raw("│"));
        spans.push(Span::styled(
            format!(" Placing {order_id} "),
            Style::default().fg(Color::Black).bg(Color::Yellow),
        ));
    }

    if let Some(ref toast) = app.toast {
        let color = match toast.level {
            ToastLevel::Info => Color::White,
            ToastLevel::Success => Color::Green,
            ToastLevel::Warning => Color::Yellow,
            ToastLevel::Error => Color::Red,
        };
        spans.push(Span::raw("│"));
        spans.push(Span::styled(
            format!(" {} ", toast.message),
            Style::default().fg(color),
        ));
    }

    let para = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(para, area);
}

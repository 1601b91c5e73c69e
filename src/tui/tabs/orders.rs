//! Orders tab: tracking lookup and order history.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::models::{Order, OrderStatus};
use crate::pricing::format_rupees;
use crate::tui::app::{App, EditTarget, TrackingResult};

/// Renders the Orders tab.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(columns[0]);

    render_tracking_input(frame, left[0], app);
    render_history(frame, left[1], app);
    render_receipt(frame, columns[1], app);
}

fn render_tracking_input(frame: &mut Frame, area: Rect, app: &App) {
    let editing = app.editing == Some(EditTarget::Tracking);
    let border = if editing { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .title(" Track order (AA-...) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    frame.render_widget(
        Paragraph::new(app.tracking_input.as_str().to_string()).block(block),
        area,
    );

    if editing {
        let x = area
            .x
            .saturating_add(1)
            .saturating_add(app.tracking_input.cursor_column());
        frame.set_cursor_position((x, area.y + 1));
    }
}

/// Orders newest first.
fn render_history(frame: &mut Frame, area: Rect, app: &App) {
    let orders = app.storefront.orders();
    let block = Block::default()
        .title(format!(" Your orders ({}) ", orders.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let items: Vec<ListItem> = orders
        .iter()
        .rev()
        .map(|order| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<13}", order.order_id), Style::default().fg(Color::White)),
                Span::raw(format!("{:<10}", order.order_type)),
                Span::styled(
                    format!("{:>11}", format_rupees(order.total)),
                    Style::default().fg(Color::Green),
                ),
                Span::raw("  "),
                status_span(order.order_status),
            ]))
        })
        .collect();

    let selected = (!orders.is_empty()).then_some(app.orders_index);
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn status_span(status: OrderStatus) -> Span<'static> {
    match status {
        OrderStatus::Confirmed => Span::styled("Confirmed", Style::default().fg(Color::Green)),
        OrderStatus::Received => Span::styled("Received", Style::default().fg(Color::Yellow)),
    }
}

fn render_receipt(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Receipt ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text: Vec<Line> = match app.tracking_result {
        None => vec![Line::from(Span::styled(
            "Enter an order id to see its receipt.",
            Style::default().fg(Color::DarkGray),
        ))],
        Some(TrackingResult::NotFound(ref id)) => vec![Line::from(Span::styled(
            format!("No order found with id {id}."),
            Style::default().fg(Color::Red),
        ))],
        Some(TrackingResult::Found(ref id)) => match app.storefront.find_order(id) {
            Some(order) => receipt_lines(order),
            None => Vec::new(),
        },
    };

    let para = Paragraph::new(text).wrap(Wrap { trim: false }).block(block);
    frame.render_widget(para, area);
}

fn receipt_lines(order: &Order) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(
            order.order_id.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        status_span(order.order_status),
    ])];
    lines.extend(order.receipt_text().lines().skip(1).map(|l| Line::from(l.to_string())));
    lines
}

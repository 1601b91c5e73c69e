//! Cart & Checkout tab layout and rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::models::OrderType;
use crate::pricing::format_rupees;
use crate::tui::app::{App, EditTarget, Focus, FormInput, Mode};
use crate::tui::input::TextInput;

/// Renders the Cart & Checkout tab.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),    // Cart lines
            Constraint::Length(3), // Note / promo input
            Constraint::Length(7), // Totals
        ])
        .split(columns[0]);

    render_lines(frame, left[0], app);
    render_line_input(frame, left[1], app);
    render_totals(frame, left[2], app);
    render_form(frame, columns[1], app);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_lines(frame: &mut Frame, area: Rect, app: &App) {
    let lines = app.storefront.lines();
    let block = Block::default()
        .title(format!(" Cart ({} items) ", app.storefront.badge_count()))
        .borders(Borders::ALL)
        .border_style(border_style(app.focus == Focus::CartLines));

    if lines.is_empty() {
        let para = Paragraph::new("Your cart is empty. Add items from the Catalog tab.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(para, area);
        return;
    }

    let items: Vec<ListItem> = lines
        .iter()
        .map(|line| {
            let mut rows = vec![Line::from(vec![
                Span::styled(format!("{:<28}", line.name), Style::default().fg(Color::White)),
                Span::raw(format!("{:>4} × {:<10}", line.quantity, format_rupees(line.price))),
                Span::styled(
                    format!("{:>10}", format_rupees(line.line_total())),
                    Style::default().fg(Color::Green),
                ),
            ])];
            if !line.special_request.is_empty() {
                rows.push(Line::from(Span::styled(
                    format!("    Note: {}", line.special_request),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(rows)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.cart_index));
    frame.render_stateful_widget(list, area, &mut state);
}

/// Input box shared by the special-request note and the promo code.
fn render_line_input(frame: &mut Frame, area: Rect, app: &App) {
    let (title, input) = match app.editing {
        Some(EditTarget::Note) => (" Special request ", &app.note_input),
        Some(EditTarget::Promo) => (" Promo code ", &app.promo_input),
        _ => {
            let promo = match app.storefront.promo_code() {
                "" => "none".to_string(),
                code => code.to_string(),
            };
            let para = Paragraph::new(format!("Promo: {promo}"))
                .block(Block::default().borders(Borders::ALL).border_style(border_style(false)));
            frame.render_widget(para, area);
            return;
        }
    };

    render_input(frame, area, title, input, true);
    place_cursor(frame, area, input);
}

fn render_totals(frame: &mut Frame, area: Rect, app: &App) {
    let totals = app.storefront.totals();
    let row = |label: &str, value: String, color: Color| {
        Line::from(vec![
            Span::raw(format!("{label:<14}")),
            Span::styled(format!("{value:>12}"), Style::default().fg(color)),
        ])
    };

    let order_type = app.storefront.order_type();
    let fee_label = match order_type {
        OrderType::Delivery => "Delivery fee",
        OrderType::Pickup => "Pickup",
    };
    let text = vec![
        row("Subtotal", format_rupees(totals.subtotal), Color::White),
        row(fee_label, format_rupees(totals.delivery_fee), Color::White),
        row("Discount", format!("-{}", format_rupees(totals.discount)), Color::Yellow),
        Line::from(vec![
            Span::styled(
                format!("{:<14}", "Total"),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:>12}", format_rupees(totals.total)),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            if app.storefront.can_submit() {
                "Press s to place order"
            } else {
                "Add items to place an order"
            },
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(format!(" {order_type} "))
        .borders(Borders::ALL)
        .border_style(border_style(false));
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_form(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Checkout ")
        .borders(Borders::ALL)
        .border_style(border_style(app.focus == Focus::Form));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(FormInput::ALL.map(|_| Constraint::Length(3)))
        .split(inner);

    for (field, row) in FormInput::ALL.iter().zip(rows.iter()) {
        let editing = app.mode == Mode::Insert && app.editing == Some(EditTarget::Form(*field));
        let selected = app.focus == Focus::Form && app.form.selected == *field;
        let mut label = field.label().to_string();
        if *field == FormInput::Address && app.storefront.order_type() == OrderType::Delivery {
            label.push('*');
        }
        render_input(
            frame,
            *row,
            &format!(" {label} "),
            app.form.input(*field),
            editing || selected,
        );
        if editing {
            place_cursor(frame, *row, app.form.input(*field));
        }
    }
}

fn render_input(frame: &mut Frame, area: Rect, title: &str, input: &TextInput, focused: bool) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(border_style(focused));
    frame.render_widget(Paragraph::new(input.as_str().to_string()).block(block), area);
}

fn place_cursor(frame: &mut Frame, area: Rect, input: &TextInput) {
    let x = area
        .x
        .saturating_add(1)
        .saturating_add(input.cursor_column())
        .min(area.right().saturating_sub(2));
    frame.set_cursor_position((x, area.y + 1));
}

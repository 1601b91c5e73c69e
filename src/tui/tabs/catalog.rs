//! Catalog tab layout and rendering.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::models::{CatalogItem, ItemLookup};
use crate::pricing::format_rupees;
use crate::tui::app::{App, CatalogStatus};

/// Renders the Catalog tab.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    if let CatalogStatus::Failed(ref reason) = app.catalog_status {
        render_unavailable(frame, area, reason);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_item_list(frame, columns[0], app);
    render_item_detail(frame, columns[1], app);
}

fn render_unavailable(frame: &mut Frame, area: Rect, reason: &str) {
    let text = vec![
        Line::from(Span::styled(
            "Our catalog is unavailable right now.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(reason.to_string()),
        Line::from(""),
        Line::from("Press r to try again. Your cart and past orders are still available."),
    ];
    let para = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().title(" Catalog ").borders(Borders::ALL));
    frame.render_widget(para, area);
}

/// Items grouped by category; headers are not selectable.
fn render_item_list(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Catalog ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.catalog_status == CatalogStatus::Loading {
        frame.render_widget(Paragraph::new("Loading products...").block(block), area);
        return;
    }

    let mut rows: Vec<ListItem> = Vec::new();
    let mut selected_row = None;
    let mut item_index = 0;
    for (category, items) in app.storefront.catalog().items_by_category() {
        let header = if category.is_empty() { "Other" } else { category };
        rows.push(ListItem::new(Line::from(Span::styled(
            header.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))));
        for item in items {
            if item_index == app.catalog_index {
                selected_row = Some(rows.len());
            }
            rows.push(ListItem::new(item_line(item)));
            item_index += 1;
        }
    }

    let list = List::new(rows)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(selected_row);
    frame.render_stateful_widget(list, area, &mut state);
}

fn item_line(item: &CatalogItem) -> Line<'static> {
    let name_style = if item.is_sold_out() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    Line::from(vec![
        Span::styled(format!("  {:<32}", item.name), name_style),
        Span::styled(
            format!("{:>10}", format_rupees(item.price)),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(item.stock_label(), stock_style(item)),
    ])
}

fn stock_style(item: &CatalogItem) -> Style {
    if item.is_sold_out() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_item_detail(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let item = app
        .selected_catalog_id()
        .and_then(|id| app.storefront.catalog().get_item(&id).cloned());
    let Some(item) = item else {
        frame.render_widget(block, area);
        return;
    };

    let mut text = vec![
        Line::from(Span::styled(
            item.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format_rupees(item.price)),
        Line::from(Span::styled(item.stock_label(), stock_style(&item))),
        Line::from(""),
    ];
    if let Some(ref description) = item.description {
        text.push(Line::from(description.clone()));
        text.push(Line::from(""));
    }
    for feature in &item.features {
        text.push(Line::from(format!("• {feature}")));
    }

    let para = Paragraph::new(text).wrap(Wrap { trim: true }).block(block);
    frame.render_widget(para, area);
}

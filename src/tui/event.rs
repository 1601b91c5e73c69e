//! Event handling for the TUI.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::cart::QuantityChange;
use crate::checkout::{CheckoutOutcome, PendingCheckout};
use crate::models::Catalog;

use super::app::{App, CatalogStatus, EditTarget, Focus, Mode, Tab, ToastLevel};
use super::input::TextInput;

/// Events that can occur in the application.
#[derive(Debug)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// Terminal was resized.
    Resize(u16, u16),
    /// Periodic tick for UI updates.
    Tick,
}

/// Messages that update application state.
#[derive(Debug)]
pub enum Message {
    /// Input event from terminal.
    Input(Event),
    /// The inventory service returned a catalog.
    CatalogLoaded(Catalog),
    /// The inventory fetch failed.
    CatalogFailed(String),
    /// A spawned checkout finished.
    CheckoutFinished(CheckoutOutcome),
}

/// Actions that require external handling (network calls).
#[derive(Debug)]
pub enum Action {
    /// Fetch the catalog again.
    ReloadCatalog,
    /// Run a validated checkout in the background.
    Submit(PendingCheckout),
}

/// Spawns a task that polls for terminal events and sends them to a channel.
pub fn spawn_event_reader(tx: mpsc::UnboundedSender<Message>) {
    tokio::spawn(async move {
        loop {
            match tokio::task::spawn_blocking(|| {
                if event::poll(Duration::from_millis(50)).unwrap_or(false) {
                    event::read().ok()
                } else {
                    None
                }
            })
            .await
            {
                Ok(Some(CrosstermEvent::Key(key))) => {
                    if tx.send(Message::Input(Event::Key(key))).is_err() {
                        break;
                    }
                }
                Ok(Some(CrosstermEvent::Resize(w, h))) => {
                    if tx.send(Message::Input(Event::Resize(w, h))).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });
}

/// Spawns a task that sends periodic tick events.
pub fn spawn_tick_timer(tx: mpsc::UnboundedSender<Message>, interval_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
        loop {
            interval.tick().await;
            if tx.send(Message::Input(Event::Tick)).is_err() {
                break;
            }
        }
    });
}

/// Updates application state based on a message.
pub fn update(app: &mut App, message: Message) -> Option<Action> {
    let action = match message {
        Message::Input(event) => handle_input(app, event),
        Message::CatalogLoaded(catalog) => {
            app.storefront.set_catalog(catalog);
            app.catalog_status = CatalogStatus::Ready;
            app.clamp_selections();
            None
        }
        Message::CatalogFailed(reason) => {
            warn!(error = %reason, "catalog unavailable");
            app.catalog_status = CatalogStatus::Failed(reason);
            None
        }
        Message::CheckoutFinished(outcome) => {
            // Failures are reported through the session's events.
            let _ = app.storefront.finish_checkout(outcome);
            None
        }
    };
    app.drain_storefront_events();
    action
}

/// Handles input events and updates application state.
fn handle_input(app: &mut App, event: Event) -> Option<Action> {
    match event {
        Event::Key(key) => handle_key(app, key),
        Event::Resize(_, _) => None,
        Event::Tick => {
            app.clear_stale_toasts();
            None
        }
    }
}

/// Handles key press events.
fn handle_key(app: &mut App, key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return None;
    }

    match app.mode {
        Mode::Normal => handle_normal_mode(app, key),
        Mode::Insert => handle_insert_mode(app, key),
    }
}

/// Handles keys in normal mode.
fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            None
        }
        KeyCode::Tab => {
            app.next_tab();
            None
        }
        KeyCode::BackTab => {
            app.previous_tab();
            None
        }
        KeyCode::Char('t') => {
            app.storefront.toggle_order_type();
            None
        }
        _ => match app.current_tab() {
            Tab::Catalog => handle_catalog_tab_keys(app, key),
            Tab::Cart => handle_cart_tab_keys(app, key),
            Tab::Orders => handle_orders_tab_keys(app, key),
        },
    }
}

/// Handles keys for the Catalog tab.
fn handle_catalog_tab_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if app.catalog_index + 1 < app.storefront.catalog().len() {
                app.catalog_index += 1;
            }
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.catalog_index = app.catalog_index.saturating_sub(1);
            None
        }
        KeyCode::Char('a') | KeyCode::Enter => {
            let id = app.selected_catalog_id()?;
            match app.storefront.add_from_catalog(&id) {
                Ok(true) => {}
                Ok(false) => app.show_toast(ToastLevel::Warning, "That item is out of stock."),
                Err(e) => report_storage_error(app, &e),
            }
            None
        }
        KeyCode::Char('r') => {
            app.catalog_status = CatalogStatus::Loading;
            Some(Action::ReloadCatalog)
        }
        _ => None,
    }
}

/// Handles keys for the Cart & Checkout tab.
fn handle_cart_tab_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => {
            app.focus = Focus::CartLines;
            None
        }
        KeyCode::Char('l') | KeyCode::Right => {
            app.focus = Focus::Form;
            None
        }
        KeyCode::Char('p') => {
            app.begin_edit(EditTarget::Promo);
            None
        }
        KeyCode::Char('s') => match app.storefront.begin_checkout(app.form.to_checkout_form()) {
            Ok(pending) => Some(Action::Submit(pending)),
            // Refusals are reported through the session's events.
            Err(_) => None,
        },
        _ => match app.focus {
            Focus::CartLines => handle_cart_line_keys(app, key),
            Focus::Form => handle_form_keys(app, key),
        },
    }
}

fn handle_cart_line_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    let index = app.cart_index;
    let result = match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if index + 1 < app.storefront.lines().len() {
                app.cart_index += 1;
            }
            return None;
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.cart_index = index.saturating_sub(1);
            return None;
        }
        KeyCode::Char('+') | KeyCode::Char('=') => app.storefront.update_quantity(index, 1),
        KeyCode::Char('-') => app.storefront.update_quantity(index, -1),
        KeyCode::Char('d') | KeyCode::Delete => app
            .storefront
            .remove_line(index)
            .map(|_| QuantityChange::Removed),
        KeyCode::Char('n') => {
            if index < app.storefront.lines().len() {
                app.begin_edit(EditTarget::Note);
            }
            return None;
        }
        _ => return None,
    };

    if let Err(e) = result {
        report_storage_error(app, &e);
    }
    app.clamp_selections();
    None
}

fn handle_form_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            app.form.selected = app.form.selected.next();
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.form.selected = app.form.selected.previous();
            None
        }
        KeyCode::Char('i') | KeyCode::Enter => {
            app.begin_edit(EditTarget::Form(app.form.selected));
            None
        }
        _ => None,
    }
}

/// Handles keys for the Orders tab.
fn handle_orders_tab_keys(app: &mut App, key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('/') | KeyCode::Char('i') => {
            app.begin_edit(EditTarget::Tracking);
            None
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.orders_index + 1 < app.storefront.orders().len() {
                app.orders_index += 1;
            }
            None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.orders_index = app.orders_index.saturating_sub(1);
            None
        }
        KeyCode::Enter => {
            let order_id = app
                .storefront
                .orders()
                .iter()
                .rev()
                .nth(app.orders_index)
                .map(|o| o.order_id.clone())?;
            app.tracking_input = TextInput::with_text(&order_id);
            app.track_order();
            None
        }
        _ => None,
    }
}

/// Handles keys in insert mode (text input).
fn handle_insert_mode(app: &mut App, key: KeyEvent) -> Option<Action> {
    let Some(target) = app.editing else {
        app.mode = Mode::Normal;
        return None;
    };

    match key.code {
        KeyCode::Esc => {
            app.end_edit();
            None
        }
        KeyCode::Enter => {
            commit_edit(app, target);
            None
        }
        KeyCode::Tab | KeyCode::Down => {
            if let EditTarget::Form(field) = target {
                app.form.selected = field.next();
                app.editing = Some(EditTarget::Form(app.form.selected));
            }
            None
        }
        KeyCode::BackTab | KeyCode::Up => {
            if let EditTarget::Form(field) = target {
                app.form.selected = field.previous();
                app.editing = Some(EditTarget::Form(app.form.selected));
            }
            None
        }
        code => {
            if let Some(input) = app.active_input() {
                match code {
                    KeyCode::Char(c) => input.insert(c),
                    KeyCode::Backspace => input.backspace(),
                    KeyCode::Delete => input.delete(),
                    KeyCode::Left => input.move_left(),
                    KeyCode::Right => input.move_right(),
                    KeyCode::Home => input.move_home(),
                    KeyCode::End => input.move_end(),
                    _ => {}
                }
            }
            None
        }
    }
}

/// Applies the edited text when Enter is pressed.
fn commit_edit(app: &mut App, target: EditTarget) {
    match target {
        EditTarget::Form(_) => {}
        EditTarget::Promo => {
            let code = app.promo_input.take();
            app.storefront.apply_promo(&code);
        }
        EditTarget::Note => {
            let text = app.note_input.take();
            if let Err(e) = app.storefront.set_special_request(app.cart_index, &text) {
                report_storage_error(app, &e);
            }
        }
        EditTarget::Tracking => app.track_order(),
    }
    app.end_edit();
}

fn report_storage_error(app: &mut App, e: &crate::StoreError) {
    error!(error = %e, "cart update not saved");
    app.show_error(format!("Could not save your cart: {e}"));
}

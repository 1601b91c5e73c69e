//! Application state for the TUI.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::checkout::CheckoutForm;
use crate::geo::Coordinate;
use crate::pricing::format_rupees;
use crate::session::{Storefront, StorefrontEvent};

use super::input::TextInput;

/// How long a toast stays on the status bar.
const TOAST_TTL: Duration = Duration::from_secs(5);

/// Central application state container.
pub struct App {
    // -- Session --
    /// The storefront session every command goes through.
    pub storefront: Storefront,
    /// Notifications published by the session.
    events: mpsc::UnboundedReceiver<StorefrontEvent>,

    // -- Tab State --
    pub tabs: Vec<Tab>,
    pub active_tab: usize,

    // -- Catalog Tab --
    pub catalog_status: CatalogStatus,
    /// Selected row in the flattened catalog list.
    pub catalog_index: usize,

    // -- Cart & Checkout Tab --
    pub focus: Focus,
    pub cart_index: usize,
    pub form: FormState,
    pub promo_input: TextInput,
    pub note_input: TextInput,

    // -- Orders Tab --
    pub tracking_input: TextInput,
    pub tracking_result: Option<TrackingResult>,
    pub orders_index: usize,

    // -- UI State --
    pub mode: Mode,
    /// Field receiving keystrokes in insert mode.
    pub editing: Option<EditTarget>,
    pub toast: Option<Toast>,

    pub should_quit: bool,
}

impl App {
    /// Creates the app around an opened storefront.
    pub fn new(mut storefront: Storefront) -> Self {
        let events = storefront.subscribe();
        Self {
            storefront,
            events,

            tabs: vec![Tab::Catalog, Tab::Cart, Tab::Orders],
            active_tab: 0,

            catalog_status: CatalogStatus::Loading,
            catalog_index: 0,

            focus: Focus::CartLines,
            cart_index: 0,
            form: FormState::default(),
            promo_input: TextInput::new(),
            note_input: TextInput::new(),

            tracking_input: TextInput::new(),
            tracking_result: None,
            orders_index: 0,

            mode: Mode::Normal,
            editing: None,
            toast: None,

            should_quit: false,
        }
    }

    pub fn current_tab(&self) -> Tab {
        self.tabs[self.active_tab]
    }

    pub fn next_tab(&mut self) {
        self.active_tab = (self.active_tab + 1) % self.tabs.len();
    }

    pub fn previous_tab(&mut self) {
        self.active_tab = self
            .active_tab
            .checked_sub(1)
            .unwrap_or(self.tabs.len() - 1);
    }

    /// Keeps list selections inside their lists after the data changed.
    pub fn clamp_selections(&mut self) {
        let catalog_len = self.storefront.catalog().len();
        self.catalog_index = self.catalog_index.min(catalog_len.saturating_sub(1));
        let cart_len = self.storefront.lines().len();
        self.cart_index = self.cart_index.min(cart_len.saturating_sub(1));
        let orders_len = self.storefront.orders().len();
        self.orders_index = self.orders_index.min(orders_len.saturating_sub(1));
    }

    /// Id of the catalog item under the cursor, in display order.
    pub fn selected_catalog_id(&self) -> Option<String> {
        self.storefront
            .catalog()
            .items_by_category()
            .into_iter()
            .flat_map(|(_, items)| items)
            .nth(self.catalog_index)
            .map(|item| item.id.clone())
    }

    /// Starts editing `target`, seeding the input from current state.
    pub fn begin_edit(&mut self, target: EditTarget) {
        match target {
            EditTarget::Note => {
                let current = self
                    .storefront
                    .lines()
                    .get(self.cart_index)
                    .map(|l| l.special_request.clone())
                    .unwrap_or_default();
                self.note_input = TextInput::with_text(&current);
            }
            EditTarget::Promo => self.promo_input.clear(),
            EditTarget::Tracking => self.tracking_input.clear(),
            EditTarget::Form(_) => {}
        }
        self.editing = Some(target);
        self.mode = Mode::Insert;
    }

    pub fn end_edit(&mut self) {
        self.editing = None;
        self.mode = Mode::Normal;
    }

    /// The input currently receiving keystrokes.
    pub fn active_input(&mut self) -> Option<&mut TextInput> {
        match self.editing? {
            EditTarget::Form(field) => Some(self.form.input_mut(field)),
            EditTarget::Promo => Some(&mut self.promo_input),
            EditTarget::Note => Some(&mut self.note_input),
            EditTarget::Tracking => Some(&mut self.tracking_input),
        }
    }

    /// Looks up an order by the id typed into the tracking field.
    pub fn track_order(&mut self) {
        let query = self.tracking_input.as_str().trim().to_string();
        if query.is_empty() {
            self.tracking_result = None;
            return;
        }
        self.tracking_result = Some(match self.storefront.find_order(&query) {
            Some(order) => TrackingResult::Found(order.order_id.clone()),
            None => TrackingResult::NotFound(query),
        });
    }

    pub fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            level,
            timestamp: Instant::now(),
        });
    }

    /// Sets an error message to display.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.show_toast(ToastLevel::Error, message);
    }

    /// Clears toasts older than [`TOAST_TTL`].
    pub fn clear_stale_toasts(&mut self) {
        if let Some(ref toast) = self.toast
            && toast.timestamp.elapsed() > TOAST_TTL
        {
            self.toast = None;
        }
    }

    /// Turns pending session notifications into toasts.
    pub fn drain_storefront_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                StorefrontEvent::CartChanged { .. } => self.clamp_selections(),
                StorefrontEvent::StockLimited { name, max } => self.show_toast(
                    ToastLevel::Warning,
                    format!("Only {max} of {name} available."),
                ),
                StorefrontEvent::PromoApplied { code } => {
                    self.show_toast(ToastLevel::Success, format!("Promo {code} applied."));
                }
                StorefrontEvent::PromoRejected { input } if input.is_empty() => {
                    self.show_toast(ToastLevel::Info, "Promo code removed.");
                }
                StorefrontEvent::PromoRejected { input } => {
                    self.show_toast(ToastLevel::Warning, format!("Invalid promo code {input}."));
                }
                StorefrontEvent::CheckoutStarted { order_id } => {
                    self.show_toast(ToastLevel::Info, format!("Placing order {order_id}..."));
                }
                StorefrontEvent::CheckoutRejected { message }
                | StorefrontEvent::OutOfRange { message } => {
                    self.show_toast(ToastLevel::Error, message);
                }
                StorefrontEvent::OrderConfirmed {
                    order_id,
                    receipt_id,
                } => {
                    self.form.clear_for_next_order();
                    self.tracking_input = TextInput::with_text(&order_id);
                    self.track_order();
                    self.show_toast(
                        ToastLevel::Success,
                        format!("Order {order_id} confirmed, receipt {receipt_id}."),
                    );
                }
                StorefrontEvent::OrderFailed { order_id, message } => {
                    self.show_toast(ToastLevel::Error, format!("Order {order_id} failed: {message}"));
                }
            }
        }
    }

    /// One-line summary of the cart totals.
    pub fn totals_summary(&self) -> String {
        let totals = self.storefront.totals();
        format!(
            "Subtotal {}  Delivery {}  Discount -{}  Total {}",
            format_rupees(totals.subtotal),
            format_rupees(totals.delivery_fee),
            format_rupees(totals.discount),
            format_rupees(totals.total)
        )
    }
}

/// Tabs in the application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Catalog,
    Cart,
    Orders,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Catalog => "Catalog",
            Tab::Cart => "Cart & Checkout",
            Tab::Orders => "Orders",
        }
    }
}

/// Catalog fetch state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CatalogStatus {
    Loading,
    Ready,
    /// The fetch failed; the message is shown in place of the catalog.
    Failed(String),
}

/// Focus within the cart tab.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    CartLines,
    Form,
}

/// Input mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    Insert,
}

/// What insert mode is editing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditTarget {
    Form(FormInput),
    Promo,
    /// Special request on the selected cart line.
    Note,
    Tracking,
}

/// Checkout form inputs, in tab order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormInput {
    #[default]
    Name,
    Phone,
    Email,
    Address,
    DetailedAddress,
    /// Optional `lat,lng` pin for the delivery point.
    Pin,
    Instructions,
}

impl FormInput {
    pub const ALL: [FormInput; 7] = [
        FormInput::Name,
        FormInput::Phone,
        FormInput::Email,
        FormInput::Address,
        FormInput::DetailedAddress,
        FormInput::Pin,
        FormInput::Instructions,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormInput::Name => "Name*",
            FormInput::Phone => "Phone*",
            FormInput::Email => "Email",
            FormInput::Address => "Address",
            FormInput::DetailedAddress => "Flat / Landmark",
            FormInput::Pin => "Pin (lat,lng)",
            FormInput::Instructions => "Instructions",
        }
    }

    pub fn next(self) -> Self {
        let pos = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let pos = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(pos + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Checkout form inputs.
#[derive(Clone, Debug, Default)]
pub struct FormState {
    pub selected: FormInput,
    name: TextInput,
    phone: TextInput,
    email: TextInput,
    address: TextInput,
    detailed_address: TextInput,
    pin: TextInput,
    instructions: TextInput,
}

impl FormState {
    pub fn input(&self, field: FormInput) -> &TextInput {
        match field {
            FormInput::Name => &self.name,
            FormInput::Phone => &self.phone,
            FormInput::Email => &self.email,
            FormInput::Address => &self.address,
            FormInput::DetailedAddress => &self.detailed_address,
            FormInput::Pin => &self.pin,
            FormInput::Instructions => &self.instructions,
        }
    }

    pub fn input_mut(&mut self, field: FormInput) -> &mut TextInput {
        match field {
            FormInput::Name => &mut self.name,
            FormInput::Phone => &mut self.phone,
            FormInput::Email => &mut self.email,
            FormInput::Address => &mut self.address,
            FormInput::DetailedAddress => &mut self.detailed_address,
            FormInput::Pin => &mut self.pin,
            FormInput::Instructions => &mut self.instructions,
        }
    }

    /// Builds the checkout form. A pin that does not parse is ignored and
    /// the address is geocoded instead.
    pub fn to_checkout_form(&self) -> CheckoutForm {
        CheckoutForm {
            name: self.name.as_str().to_string(),
            phone: self.phone.as_str().to_string(),
            email: self.email.as_str().to_string(),
            address: self.address.as_str().to_string(),
            detailed_address: self.detailed_address.as_str().to_string(),
            special_instructions: self.instructions.as_str().to_string(),
            coordinate: parse_pin(self.pin.as_str()),
        }
    }

    /// Clears per-order fields after a confirmed order, keeping contact
    /// details for the next one.
    pub fn clear_for_next_order(&mut self) {
        self.instructions.clear();
        self.pin.clear();
    }
}

/// Parses `"lat,lng"`.
pub fn parse_pin(text: &str) -> Option<Coordinate> {
    let (lat, lng) = text.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lng = lng.trim().parse::<f64>().ok()?;
    let point = Coordinate::new(lat, lng);
    point.is_valid().then_some(point)
}

/// Outcome of a tracking lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackingResult {
    Found(String),
    NotFound(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Status bar message with timestamp for auto-clear.
#[derive(Clone, Debug)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub timestamp: Instant,
}

//! Terminal user interface for the storefront.
//!
//! Provides a Ratatui-based TUI with catalog browsing, the cart and
//! checkout form, and order tracking, all driven through
//! [`Storefront`](crate::session::Storefront).

pub mod app;
pub mod components;
pub mod event;
pub mod input;
pub mod tabs;
pub mod terminal;
pub mod ui;

pub use app::App;
pub use event::{Action, Event, Message};
pub use terminal::{Tui, restore_terminal, setup_terminal};
pub use ui::render;

//! Text input handling.

mod text_input;

pub use text_input::TextInput;

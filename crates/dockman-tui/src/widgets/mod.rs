//! Reusable widgets

mod dialog;
mod text_input;

pub use dialog::{centered_rect, DialogBuilder, DialogFocus};
pub use text_input::TextInputState;

//! HTML handling for email bodies.

pub mod text;

pub use text::{html_to_text, BODY_TEXT_LIMIT};

//! Display adapters.
//!
//! The in-memory display emulates the selection-owner registry and the
//! keyboard device for tests and headless sessions. A production display
//! backend implements the same ports against a real server connection.

mod keyboard;
mod selection;

pub use keyboard::InMemoryKeyboard;
pub use selection::InMemoryDisplay;

//! Windows UI Automation provider.

mod element;
mod engine;
mod input;
mod types;
mod utils;

pub use element::WindowsUIElement;
pub use engine::WindowsEngine;
pub use input::WindowsInput;

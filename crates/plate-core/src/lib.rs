pub mod command;
mod config;
mod document;
mod editor;
mod error;
mod field;
mod history;
pub mod html;
mod inline;
mod keymap;
pub mod normalize;
mod ops;
mod shortcut;
mod snapshot;
mod toolbar;

pub use crate::command::{BlockKind, Command, Transition};
pub use crate::config::*;
pub use crate::document::*;
pub use crate::editor::*;
pub use crate::error::*;
pub use crate::field::*;
pub use crate::history::*;
pub use crate::html::HtmlBridge;
pub use crate::keymap::*;
pub use crate::normalize::NormalizePass;
pub use crate::ops::*;
pub use crate::shortcut::*;
pub use crate::snapshot::*;
pub use crate::toolbar::*;

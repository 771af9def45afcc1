//! Headless controller for an open spreadsheet document.
//!
//! The controller owns navigation state, undo bookkeeping and the right panel. Everything it
//! talks to (the server channel, the document model, the view renderers, tour UI) sits behind
//! a trait with a `Missing*` or no-op stand-in, so the crate runs without any UI.

pub mod action_log;
pub mod channel;
pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod link;
pub mod model;
pub mod navigator;
pub mod page;
pub mod tools;
pub mod tour;
pub mod undo;
pub mod url_state;
pub mod view;

pub use channel::{DocChannel, MissingDocChannel, SendOptions};
pub use config::{load_settings, load_settings_from, Settings};
pub use controller::{DocController, DocEvent};
pub use error::{DocControllerError, NavigationError};
pub use model::{DocModel, DocSnapshot, MemoryDocModel, MissingDocModel};
pub use tour::{NoTourLauncher, TourLauncher, TourPrefs};
pub use view::{MissingViewRegistry, ViewInstance, ViewRegistry};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

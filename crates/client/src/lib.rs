//! `encore-client` — the application layer of the Encore catalog client.
//!
//! Wires the session manager, the navigation guard and the event workflow gate
//! to the remote catalog API. [`EncoreApp`] is the entry point; the `encore`
//! binary drives it from a line-oriented shell.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod notice;
pub mod render;
pub mod screen;

pub use api::{CatalogApi, HttpCatalogApi, Registration};
pub use app::{EncoreApp, LoadOutcome};
pub use config::ClientConfig;
pub use error::{ActionError, ApiError, ErrorClass};
pub use notice::{Notice, NoticeLevel};
pub use screen::{Details, Screen};

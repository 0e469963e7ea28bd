//! Folio site kernel.
//!
//! Form actions, the result relay middleware and the page routes. The
//! `folio` binary wires these to the production upstream clients.

pub mod action;
pub mod config;
pub mod error;
pub mod relay;
pub mod routes;
pub mod sanitize;
pub mod secrets;
pub mod services;
pub mod state;

pub use config::Config;
pub use routes::app;
pub use state::{AppState, Services};

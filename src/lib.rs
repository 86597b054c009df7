// Public module exports for the xray binary and integration tests
pub mod analysis;
pub mod app;
pub mod bundle;
pub mod capture;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod document;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod sample;
pub mod viz;

#[cfg(feature = "tui")]
pub mod tui;

pub use error::{XrayError, XrayResult};

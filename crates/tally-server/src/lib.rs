//! Metrics service: typed storage of gauges and counters behind a thin HTTP
//! ingress.

pub mod api;
pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod service;
pub mod state;

//! Prometheus exporter for SwitchBot devices.
//!
//! This crate polls the SwitchBot cloud API on every scrape and exposes the
//! readings of meters and plugs via an HTTP `/metrics` endpoint, together with
//! a `/discover` endpoint for Prometheus HTTP service discovery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  SwitchBot API  │<────│    Responders   │<────│   HTTP Server   │
//! │   (v1.1 REST)   │     │ (per-scrape reg)│     │ (/metrics, ...) │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//!          ^                       │
//!          │              ┌─────────────────┐     ┌─────────────────┐
//!          └──────────────│ Reload actor    │<────│ SIGHUP, /-/reload│
//!                         │ (device roster) │     └─────────────────┘
//!                         └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! SWITCHBOT_OPENTOKEN=... SWITCHBOT_SECRETKEY=... switchbot-exporter
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod http;
pub mod metrics;
pub mod reload;

pub use cache::DeviceLabelCache;
pub use config::ExporterConfig;
pub use http::{AppState, HttpServer, create_router};
pub use metrics::MetricsSnapshot;
pub use reload::{ReloadCoordinator, ReloadHandle};

//! HTTP server and background scheduler for word bracket tournaments.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod scheduler;

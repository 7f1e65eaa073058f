//! HTTP transport for the persona engine.
//!
//! # Endpoints
//!
//! - `GET  /health`            — Liveness probe
//! - `POST /chat`              — Free-text message
//! - `POST /command`           — Slash command
//! - `GET  /personality`       — Shared personality snapshot
//! - `GET  /users/:id/context` — Per-user learned context

pub mod routes;

pub use routes::{app_router, AppState};

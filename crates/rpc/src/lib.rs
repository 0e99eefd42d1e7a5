//! HTTP API layer for the obesity profile prediction service.

pub mod server;

pub use server::{build_router, start_server, AppState};

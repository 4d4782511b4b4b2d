//! HTTP and WebSocket surface of the trading simulator.

mod accounts;
pub mod auth;
pub mod error;
mod lenient;
mod orders;
pub mod routes;
mod schedule;
pub mod state;
mod stocks;
mod ws;

use axum::Router;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, DEFAULT_STARTING_CASH};

pub fn app(state: AppState) -> Router {
    routes::router(state)
}

use std::time::Duration;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{accounts, orders, schedule, state::AppState, stocks, ws};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/api", get(welcome))
        .route("/api/register", post(accounts::register))
        .route("/api/login", post(accounts::login))
        .route("/api/balance/:user_id", get(accounts::balance))
        .route("/api/deposit", post(accounts::deposit))
        .route("/api/withdraw", post(accounts::withdraw))
        .route("/api/buy", post(orders::buy))
        .route("/api/sell", post(orders::sell))
        .route("/api/transactions", get(orders::transactions))
        .route("/api/transactions/cancel", post(orders::cancel))
        .route("/api/portfolio/:user_id", get(orders::portfolio))
        .route("/api/data", get(stocks::list))
        .route("/api/addStock", post(stocks::add))
        .route("/api/stock/:id", put(stocks::update))
        .route("/api/deleteStock/:id", delete(stocks::remove))
        .route("/api/market-schedule", get(schedule::show))
        .route("/api/market-schedule/:id", put(schedule::update))
        .route("/ws/events", get(ws::events_socket))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn welcome() -> &'static str {
    "Welcome to the Stock Trading API!"
}

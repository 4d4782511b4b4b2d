use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use core_sim::{NewOrder, Order, OrderSide, OrderStatus, PortfolioPosition, MAX_ORDER_QUANTITY};
use serde::{Deserialize, Serialize};
use store::StoreError;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    lenient,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(rename = "userID", default, deserialize_with = "lenient::opt_i64")]
    user_id: Option<i64>,
    #[serde(rename = "stockID", default, deserialize_with = "lenient::opt_i64")]
    stock_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    shares: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    price: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OrderPlaced {
    message: &'static str,
    #[serde(rename = "transactionID")]
    transaction_id: i64,
}

pub async fn buy(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<Json<OrderPlaced>> {
    let Json(body) = payload?;
    place(&state, OrderSide::Buy, body)
}

pub async fn sell(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> ApiResult<Json<OrderPlaced>> {
    let Json(body) = payload?;
    place(&state, OrderSide::Sell, body)
}

/// Intake only checks presence; funds and holdings are settled later.
fn place(state: &AppState, side: OrderSide, body: OrderRequest) -> ApiResult<Json<OrderPlaced>> {
    let missing = || ApiError::bad_request("Missing required fields.");
    let order = NewOrder {
        user_id: body.user_id.ok_or_else(missing)?,
        stock_id: body.stock_id.ok_or_else(missing)?,
        side,
        quantity: body.shares.ok_or_else(missing)?,
        price: body.price.ok_or_else(missing)?,
    };
    if !order.is_complete() {
        return Err(missing());
    }
    if !order.within_limits() {
        return Err(ApiError::bad_request(format!(
            "shares must not exceed {MAX_ORDER_QUANTITY}"
        )));
    }

    let placed = state.store().insert_order(&order, state.now())?;
    info!(
        transaction_id = placed.id,
        user_id = placed.user_id,
        stock_id = placed.stock_id,
        side = %placed.side,
        quantity = placed.quantity,
        price = placed.price,
        "order placed"
    );

    let message = match side {
        OrderSide::Buy => "Buy order placed successfully (Pending).",
        OrderSide::Sell => "Sell order placed successfully (Pending).",
    };
    Ok(Json(OrderPlaced {
        message,
        transaction_id: placed.id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(rename = "transactionID", default, deserialize_with = "lenient::opt_i64")]
    transaction_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    message: &'static str,
    #[serde(rename = "newStatus")]
    new_status: OrderStatus,
}

pub async fn cancel(
    State(state): State<AppState>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> ApiResult<Json<CancelResponse>> {
    let Json(body) = payload?;
    let id = body
        .transaction_id
        .ok_or_else(|| ApiError::bad_request("transactionID is required"))?;

    state.store().cancel_order(id).map_err(|err| match err {
        StoreError::NotFound(_) => {
            ApiError::not_found("Transaction not found or already processed")
        }
        other => other.into(),
    })?;

    info!(transaction_id = id, "order cancelled");
    Ok(Json(CancelResponse {
        message: "Transaction cancelled successfully",
        new_status: OrderStatus::Cancelled,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(rename = "userID")]
    user_id: Option<String>,
}

pub async fn transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionsQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let user_id = query
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("userID is required"))?
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request("userID must be a number"))?;

    Ok(Json(state.store().orders_for_user(user_id)?))
}

pub async fn portfolio(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<PortfolioPosition>>> {
    Ok(Json(state.store().portfolio(user_id)?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use chrono::Duration;
    use serde_json::json;

    use crate::test_support::{get, json_request, send, test_app};

    #[tokio::test]
    async fn buy_and_sell_create_pending_orders() {
        let (app, state) = test_app();

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/buy",
                json!({ "userID": 1, "stockID": 2, "shares": 5, "price": 12.5 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Buy order placed successfully (Pending).");

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/sell",
                json!({ "userID": "1", "stockID": "2", "shares": "5", "price": "13" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Sell order placed successfully (Pending).");

        let orders = state.store().orders_for_user(1).unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders
            .iter()
            .all(|order| order.status == core_sim::OrderStatus::Pending));
        assert_eq!(orders[0].created_at, state.now());
    }

    #[tokio::test]
    async fn missing_or_zero_fields_are_rejected() {
        let (app, _) = test_app();

        for body in [
            json!({ "userID": 1, "stockID": 2, "price": 10 }),
            json!({ "userID": 1, "stockID": 2, "shares": 0, "price": 10 }),
        ] {
            let (status, body) = send(&app, json_request(Method::POST, "/api/buy", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Missing required fields.");
        }
    }

    #[tokio::test]
    async fn oversized_orders_are_refused_at_intake() {
        let (app, state) = test_app();

        for shares in [json!(i64::MAX), json!(1e30), json!("1000000001")] {
            let (status, body) = send(
                &app,
                json_request(
                    Method::POST,
                    "/api/buy",
                    json!({ "userID": 1, "stockID": 2, "shares": shares, "price": 10 }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{shares}");
            assert!(body["error"].is_string());
        }
        assert!(state.store().orders_for_user(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_succeeds_once() {
        let (app, _) = test_app();
        let (_, placed) = send(
            &app,
            json_request(
                Method::POST,
                "/api/buy",
                json!({ "userID": 1, "stockID": 2, "shares": 5, "price": 12.5 }),
            ),
        )
        .await;
        let cancel = json!({ "transactionID": placed["transactionID"] });

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/transactions/cancel", cancel.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["newStatus"], "CANCELLED");

        let (status, body) =
            send(&app, json_request(Method::POST, "/api/transactions/cancel", cancel)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Transaction not found or already processed");
    }

    #[tokio::test]
    async fn cancel_requires_an_id() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/transactions/cancel", json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "transactionID is required");
    }

    #[tokio::test]
    async fn transactions_are_newest_first_and_need_user() {
        let (app, state) = test_app();
        let store = state.store();
        let base = state.now();
        let order = |price: f64| core_sim::NewOrder {
            user_id: 9,
            stock_id: 1,
            side: core_sim::OrderSide::Buy,
            quantity: 1,
            price,
        };
        store.insert_order(&order(1.0), base).unwrap();
        store
            .insert_order(&order(2.0), base + Duration::seconds(10))
            .unwrap();

        let (status, body) = send(&app, get("/api/transactions?userID=9")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[0]["Price"], 2.0);
        assert_eq!(body[0]["TransactionType"], "BUY");

        let (status, body) = send(&app, get("/api/transactions")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "userID is required");
    }

    #[tokio::test]
    async fn empty_portfolio_is_an_empty_list() {
        let (app, _) = test_app();

        let (status, body) = send(&app, get("/api/portfolio/77")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}

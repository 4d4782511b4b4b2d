use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use core_sim::{Instrument, InstrumentDraft};
use serde::{Deserialize, Serialize};
use store::StoreError;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    lenient,
    state::AppState,
};

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Instrument>>> {
    Ok(Json(state.store().list_instruments()?))
}

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    ticker: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    volume: Option<i64>,
    #[serde(rename = "dayHigh", default, deserialize_with = "lenient::opt_f64")]
    day_high: Option<f64>,
    #[serde(rename = "dayLow", default, deserialize_with = "lenient::opt_f64")]
    day_low: Option<f64>,
    #[serde(rename = "dayStart", default, deserialize_with = "lenient::opt_f64")]
    day_start: Option<f64>,
    #[serde(rename = "dayEnd", default, deserialize_with = "lenient::opt_f64")]
    day_end: Option<f64>,
}

impl StockRequest {
    /// Ticker, company, price and volume are required; day fields fall back
    /// to the price.
    fn into_draft(self) -> ApiResult<InstrumentDraft> {
        let (Some(ticker), Some(company_name), Some(price), Some(volume)) =
            (self.ticker, self.company, self.price, self.volume)
        else {
            return Err(ApiError::bad_request(
                "Ticker, Company, CurrentPrice, and Volume are required",
            ));
        };
        if price <= 0.0 || volume <= 0 {
            return Err(ApiError::bad_request(
                "Ticker, Company, CurrentPrice, and Volume are required",
            ));
        }

        let or_price = |value: Option<f64>| value.filter(|v| *v > 0.0).unwrap_or(price);
        Ok(InstrumentDraft {
            ticker,
            company_name,
            price,
            volume,
            day_high: or_price(self.day_high),
            day_low: or_price(self.day_low),
            day_start: or_price(self.day_start),
            day_end: or_price(self.day_end),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StockAdded {
    message: &'static str,
    stock: Instrument,
}

#[derive(Debug, Serialize)]
pub struct Message {
    message: String,
}

fn stock_error(err: StoreError) -> ApiError {
    match err {
        StoreError::Duplicate(_) => ApiError::Conflict("Ticker already exists".to_string()),
        StoreError::NotFound(_) => ApiError::not_found("Stock not found"),
        other => other.into(),
    }
}

pub async fn add(
    State(state): State<AppState>,
    payload: Result<Json<StockRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StockAdded>)> {
    let Json(body) = payload?;
    let draft = body.into_draft()?;

    let stock = state
        .store()
        .insert_instrument(&draft)
        .map_err(stock_error)?;
    info!(stock_id = stock.id, ticker = %stock.ticker, "stock added");

    Ok((
        StatusCode::CREATED,
        Json(StockAdded {
            message: "Stock added successfully",
            stock,
        }),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<StockRequest>, JsonRejection>,
) -> ApiResult<Json<Message>> {
    let Json(body) = payload?;
    let draft = body.into_draft()?;

    state
        .store()
        .update_instrument(id, &draft)
        .map_err(stock_error)?;
    info!(stock_id = id, ticker = %draft.ticker, "stock updated");

    Ok(Json(Message {
        message: "Stock updated successfully.".to_string(),
    }))
}

/// Orders and holdings that reference the stock are left untouched.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Message>> {
    state
        .store()
        .delete_instrument(id)
        .map_err(stock_error)?;
    info!(stock_id = id, "stock deleted");

    Ok(Json(Message {
        message: format!("Stock with id {id} deleted successfully"),
    }))
}

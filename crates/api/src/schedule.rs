use std::collections::BTreeSet;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use core_sim::{
    calendar::{self, DEFAULT_CLOSE, DEFAULT_OPEN, DEFAULT_OPEN_DAYS},
    MarketEvent, MarketSchedule,
};
use serde::{Deserialize, Serialize};
use store::StoreError;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    lenient,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct ScheduleView {
    #[serde(rename = "MarketOpen")]
    market_open: String,
    #[serde(rename = "MarketClose")]
    market_close: String,
    #[serde(rename = "OpenDays")]
    open_days: String,
    #[serde(rename = "Holidays")]
    holidays: String,
    #[serde(rename = "MarketStatus")]
    market_status: u8,
}

impl From<&MarketSchedule> for ScheduleView {
    fn from(schedule: &MarketSchedule) -> Self {
        Self {
            market_open: calendar::format_time_of_day(schedule.open),
            market_close: calendar::format_time_of_day(schedule.close),
            open_days: schedule.open_days_csv(),
            holidays: schedule.holidays_csv(),
            market_status: u8::from(schedule.status),
        }
    }
}

pub async fn show(State(state): State<AppState>) -> ApiResult<Json<ScheduleView>> {
    let schedule = state
        .store()
        .market_schedule()?
        .ok_or_else(|| ApiError::not_found("No market schedule found"))?;
    Ok(Json(ScheduleView::from(&schedule)))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    #[serde(rename = "openTime", default, deserialize_with = "lenient::opt_string")]
    open_time: Option<String>,
    #[serde(rename = "closeTime", default, deserialize_with = "lenient::opt_string")]
    close_time: Option<String>,
    #[serde(rename = "openWeekdays", default, deserialize_with = "lenient::opt_list")]
    open_weekdays: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_list")]
    holidays: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::opt_bool")]
    status: Option<bool>,
}

impl ScheduleRequest {
    /// Missing fields take the defaults: 09:00-17:00, Monday to Friday, no
    /// holidays, closed.
    fn into_schedule(self, id: i64) -> ApiResult<MarketSchedule> {
        let open = parse_time(self.open_time.as_deref().unwrap_or(DEFAULT_OPEN), "openTime")?;
        let close = parse_time(self.close_time.as_deref().unwrap_or(DEFAULT_CLOSE), "closeTime")?;

        let requested_days = self
            .open_weekdays
            .map(|days| calendar::parse_open_days(&days.join(",")))
            .unwrap_or_default();
        let open_days: BTreeSet<u8> = if requested_days.is_empty() {
            DEFAULT_OPEN_DAYS.into_iter().collect()
        } else {
            requested_days
        };

        Ok(MarketSchedule {
            id,
            open,
            close,
            open_days,
            holidays: self.holidays.unwrap_or_default(),
            status: self.status.unwrap_or(false),
        })
    }
}

fn parse_time(value: &str, field: &str) -> ApiResult<chrono::NaiveTime> {
    calendar::parse_time_of_day(value)
        .ok_or_else(|| ApiError::bad_request(format!("{field} must be HH:MM or HH:MM:SS")))
}

#[derive(Debug, Serialize)]
pub struct ScheduleUpdated {
    message: &'static str,
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ScheduleRequest>, JsonRejection>,
) -> ApiResult<Json<ScheduleUpdated>> {
    let Json(body) = payload?;
    let schedule = body.into_schedule(id)?;
    let previous_status = state
        .store()
        .market_schedule()?
        .filter(|current| current.id == id)
        .map(|current| current.status);

    state
        .store()
        .update_schedule(&schedule)
        .map_err(|err| match err {
            StoreError::NotFound(_) => ApiError::not_found("Market schedule not found"),
            other => other.into(),
        })?;

    info!(
        open = %calendar::format_time_of_day(schedule.open),
        close = %calendar::format_time_of_day(schedule.close),
        days = %schedule.open_days_csv(),
        status = schedule.status,
        "market schedule updated"
    );
    if previous_status != Some(schedule.status) {
        state.publish_event(MarketEvent::market_status_changed(schedule.status));
    }

    Ok(Json(ScheduleUpdated {
        message: "Market schedule updated successfully",
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use core_sim::MarketEvent;
    use serde_json::json;

    use crate::test_support::{get, json_request, send, test_app};

    #[tokio::test]
    async fn seeded_schedule_is_readable() {
        let (app, _) = test_app();

        let (status, body) = send(&app, get("/api/market-schedule")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "MarketOpen": "09:00",
                "MarketClose": "17:00",
                "OpenDays": "1,2,3,4,5",
                "Holidays": "",
                "MarketStatus": 0
            })
        );
    }

    #[tokio::test]
    async fn update_accepts_loose_shapes_and_notifies() {
        let (app, state) = test_app();
        let mut events = state.subscribe_events();

        let (status, _) = send(
            &app,
            json_request(
                Method::PUT,
                "/api/market-schedule/1",
                json!({
                    "openTime": "08:30:00",
                    "closeTime": "16:00",
                    "openWeekdays": [1, 2, 3],
                    "holidays": "2024-12-25,2025-01-01",
                    "status": 1
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get("/api/market-schedule")).await;
        assert_eq!(body["MarketOpen"], "08:30");
        assert_eq!(body["MarketClose"], "16:00");
        assert_eq!(body["OpenDays"], "1,2,3");
        assert_eq!(body["Holidays"], "2024-12-25,2025-01-01");
        assert_eq!(body["MarketStatus"], 1);
        assert_eq!(
            events.try_recv().unwrap(),
            MarketEvent::market_status_changed(true)
        );
    }

    #[tokio::test]
    async fn empty_update_restores_defaults() {
        let (app, _) = test_app();

        let (status, _) = send(
            &app,
            json_request(Method::PUT, "/api/market-schedule/1", json!({ "openWeekdays": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get("/api/market-schedule")).await;
        assert_eq!(body["MarketOpen"], "09:00");
        assert_eq!(body["OpenDays"], "1,2,3,4,5");
        assert_eq!(body["MarketStatus"], 0);
    }

    #[tokio::test]
    async fn bad_time_and_unknown_id_are_rejected() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            json_request(Method::PUT, "/api/market-schedule/1", json!({ "openTime": "soon" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "openTime must be HH:MM or HH:MM:SS");

        let (status, _) = send(
            &app,
            json_request(Method::PUT, "/api/market-schedule/9", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

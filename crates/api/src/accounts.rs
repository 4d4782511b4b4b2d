use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use core_sim::{NewUser, UserProfile, UserRole};
use serde::{Deserialize, Serialize};
use store::StoreError;
use tracing::{error, info};

use crate::{
    auth::{hash_password, verify_password},
    error::{ApiError, ApiResult},
    lenient,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "FullName", default, deserialize_with = "lenient::opt_string")]
    full_name: Option<String>,
    #[serde(rename = "Username", default, deserialize_with = "lenient::opt_string")]
    username: Option<String>,
    #[serde(rename = "Password", default, deserialize_with = "lenient::opt_string")]
    password: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "lenient::opt_string")]
    email: Option<String>,
    #[serde(rename = "UserType", default, deserialize_with = "lenient::opt_string")]
    user_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    message: &'static str,
    #[serde(rename = "userID")]
    user_id: i64,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(body) = payload?;
    let (Some(full_name), Some(username), Some(password), Some(email), Some(user_type)) = (
        body.full_name,
        body.username,
        body.password,
        body.email,
        body.user_type,
    ) else {
        return Err(ApiError::bad_request("All fields are required."));
    };
    let role = UserRole::parse(&user_type)
        .ok_or_else(|| ApiError::bad_request("UserType must be Customer or Admin."))?;

    let password_hash = hash_password(&password).map_err(|err| {
        error!(error = %err, "password hashing failed");
        ApiError::Internal("Registration failed".to_string())
    })?;
    let user = NewUser {
        full_name,
        username,
        email,
        role,
        password_hash,
    };
    let profile = state
        .store()
        .create_user(&user, state.starting_cash())
        .map_err(|err| match err {
            StoreError::Duplicate(_) => {
                ApiError::Conflict("Username or email already exists.".to_string())
            }
            other => other.into(),
        })?;

    info!(user_id = profile.id, username = %profile.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully!",
            user_id: profile.id,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "UsernameOrEmail", default, deserialize_with = "lenient::opt_string")]
    username_or_email: Option<String>,
    #[serde(rename = "Password", default, deserialize_with = "lenient::opt_string")]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    message: &'static str,
    user: UserProfile,
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(body) = payload?;
    let (Some(login), Some(password)) = (body.username_or_email, body.password) else {
        return Err(ApiError::bad_request(
            "Username/email and password are required.",
        ));
    };

    let invalid = || ApiError::Unauthorized("Invalid credentials.".to_string());
    let credentials = state.store().find_credentials(&login)?.ok_or_else(invalid)?;
    if !verify_password(&password, &credentials.password_hash) {
        return Err(invalid());
    }

    Ok(Json(LoginResponse {
        message: "Login successful",
        user: credentials.profile,
    }))
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    #[serde(rename = "userID")]
    user_id: i64,
    balance: f64,
}

pub async fn balance(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<BalanceResponse>> {
    let balance = state.store().balance(user_id)?;
    Ok(Json(BalanceResponse { user_id, balance }))
}

#[derive(Debug, Deserialize)]
pub struct CashRequest {
    #[serde(rename = "userID", default, deserialize_with = "lenient::opt_i64")]
    user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    amount: Option<f64>,
}

impl CashRequest {
    fn validate(self) -> ApiResult<(i64, f64)> {
        match (self.user_id, self.amount) {
            (Some(user_id), Some(amount)) if user_id > 0 && amount > 0.0 => Ok((user_id, amount)),
            _ => Err(ApiError::bad_request("userID and positive amount required")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CashResponse {
    message: &'static str,
    balance: f64,
}

pub async fn deposit(
    State(state): State<AppState>,
    payload: Result<Json<CashRequest>, JsonRejection>,
) -> ApiResult<Json<CashResponse>> {
    let Json(body) = payload?;
    let (user_id, amount) = body.validate()?;

    let balance = state.store().deposit(user_id, amount)?;
    info!(user_id, amount, balance, "deposit");
    Ok(Json(CashResponse {
        message: "Deposit successful",
        balance,
    }))
}

pub async fn withdraw(
    State(state): State<AppState>,
    payload: Result<Json<CashRequest>, JsonRejection>,
) -> ApiResult<Json<CashResponse>> {
    let Json(body) = payload?;
    let (user_id, amount) = body.validate()?;

    let balance = state.store().withdraw(user_id, amount)?;
    info!(user_id, amount, balance, "withdrawal");
    Ok(Json(CashResponse {
        message: "Withdrawal successful",
        balance,
    }))
}

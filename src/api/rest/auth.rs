use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::Json;
use axum::Router;

use crate::api::rest::{respond, ApiResponse};
use crate::auth::token::bearer_token;
use crate::error::AppError;
use crate::state::AppState;
use crate::workflow::users::{login as login_user, logout as logout_user, Credentials, LoginOutcome};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<Json<ApiResponse<LoginOutcome>>, AppError> {
    let outcome = login_user(&state, payload).await?;
    Ok(respond("User logged in successfully", outcome))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthenticated)?;
    logout_user(&state, token)?;
    Ok(respond("User logged out successfully", ()))
}

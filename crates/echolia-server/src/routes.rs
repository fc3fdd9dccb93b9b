//! HTTP routes for the inference gateway.
//!
//! - `GET  /inference/public-key` — key advertisement (bearer auth, no
//!   body; cacheable until the advertised expiry)
//! - `POST /inference/execute` — run one E2EE inference (bearer auth)
//! - `GET  /inference/usage` — quota standing, no reservation (bearer
//!   auth)
//! - `GET  /inference/provider` — configured backend and model

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use echolia_proto::{
    ExecuteRequest, ExecuteResponse, ProviderInfo, PublicKeyResponse, UsageInfo,
};

use crate::error::ApiError;
use crate::identity::Principal;
use crate::state::AppState;

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/inference/public-key", get(public_key))
        .route("/inference/execute", post(execute))
        .route("/inference/usage", get(usage))
        .route("/inference/provider", get(provider_info))
        .with_state(state)
}

async fn public_key(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    Ok(Json(state.orchestrator.public_key()?))
}

async fn execute(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    tracing::info!(
        principal = %principal.user_id,
        device = %principal.device_id,
        task = %request.task,
        "execute request received"
    );

    let response = state.orchestrator.execute(&principal.user_id, &request).await?;
    Ok(Json(response))
}

async fn usage(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<UsageInfo>, ApiError> {
    let snapshot = state.orchestrator.usage(&principal.user_id)?;
    Ok(Json(snapshot.to_wire()))
}

async fn provider_info(State(state): State<AppState>) -> Json<ProviderInfo> {
    Json(state.orchestrator.provider_info())
}

//! Workbench API sub-application, mounted by the gateway at `/api/v1`.
//!
//! The gateway treats this router as opaque: it only calls [`router`] and
//! nests the result. All shared configuration is read from the
//! [`SettingsStore`] handle passed in at construction.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use parlor_settings::{PromptSuggestion, SettingsStore};
use serde::Serialize;

#[derive(Clone)]
struct WebuiState {
    settings: SettingsStore,
}

/// Build the sub-application router around a shared settings handle.
pub fn router(settings: SettingsStore) -> Router {
    Router::new()
        .route("/", get(status))
        .with_state(WebuiState { settings })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: bool,
    default_models: Option<String>,
    default_prompt_suggestions: Vec<PromptSuggestion>,
}

async fn status(State(state): State<WebuiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: true,
        default_models: state.settings.default_models().map(str::to_string),
        default_prompt_suggestions: state.settings.default_prompt_suggestions().to_vec(),
    })
}

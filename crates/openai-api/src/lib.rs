//! OpenAI-compatible sub-application, mounted by the gateway at `/openai/api`.
//!
//! Serves the model listing in the OpenAI wire shape. The shared model
//! filter is read from the [`SettingsStore`] on every request, so an admin
//! write through the gateway takes effect immediately.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use parlor_settings::SettingsStore;
use serde::Serialize;

/// One entry of the model catalog, in the OpenAI `GET /models` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub id: String,
    pub object: String,
    pub owned_by: String,
}

impl ModelSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            owned_by: "openai".to_string(),
        }
    }
}

#[derive(Clone)]
struct OpenAiState {
    settings: SettingsStore,
    catalog: Arc<Vec<ModelSummary>>,
}

/// Build the sub-application router around a shared settings handle and the
/// model catalog this deployment advertises.
pub fn router(settings: SettingsStore, catalog: Vec<ModelSummary>) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .with_state(OpenAiState {
            settings,
            catalog: Arc::new(catalog),
        })
}

#[derive(Debug, Serialize)]
struct ModelListResponse {
    object: String,
    data: Vec<ModelSummary>,
}

async fn list_models(State(state): State<OpenAiState>) -> Json<ModelListResponse> {
    let filter = state.settings.model_filter().await;
    let data = state
        .catalog
        .iter()
        .filter(|model| filter.permits(&model.id))
        .cloned()
        .collect();

    Json(ModelListResponse {
        object: "list".to_string(),
        data,
    })
}

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Request, State};
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parlor_openai_api::ModelSummary;
use parlor_settings::{ModelFilter, PromptSuggestion, SettingsSeed, SettingsStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod api_envelope;
pub mod changelog;
pub mod config;
pub mod release_check;

use crate::api_envelope::{
    ApiErrorCode, ApiErrorResponse, error_response, error_response_with_status, not_found_error,
    unauthorized_error, validation_error,
};
use crate::changelog::Changelog;
use crate::config::{Config, FALLBACK_LOCALE};
use crate::release_check::ReleaseClient;

const SERVICE_NAME: &str = "parlor-gateway";
const HEADER_PROCESS_TIME: &str = "x-process-time";
const CHANGELOG_ENTRY_LIMIT: usize = 5;
// Served verbatim whenever the release lookup fails, regardless of cause.
const RELEASE_LOOKUP_UNAVAILABLE_MESSAGE: &str = "API rate limit exceeded";
const CACHE_IMMUTABLE_ONE_YEAR: &str = "public, max-age=31536000, immutable";
const CACHE_SHORT_LIVED: &str = "public, max-age=60";
const CACHE_MANIFEST: &str = "no-cache, no-store, must-revalidate";
const PWA_BACKGROUND_COLOR: &str = "#343541";

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    settings: SettingsStore,
    changelog: Changelog,
    release_client: ReleaseClient,
    started_at: SystemTime,
}

pub fn build_router(config: Config) -> Router {
    let settings = SettingsStore::from_seed(settings_seed(&config));
    let changelog = match Changelog::load(&config.changelog_path) {
        Ok(changelog) => changelog,
        Err(error) => {
            warn!(%error, "changelog unavailable, serving an empty mapping");
            Changelog::default()
        }
    };
    let release_client = ReleaseClient::from_config(&config);
    let webui_router = parlor_webui_api::router(settings.clone());
    let openai_router = parlor_openai_api::router(settings.clone(), openai_catalog(&config));

    let state = AppState {
        config: Arc::new(config),
        settings,
        changelog,
        release_client,
        started_at: SystemTime::now(),
    };
    let admin_state = state.clone();

    let admin_api_router = Router::new()
        .route(
            "/api/config/model/filter",
            get(get_model_filter).post(update_model_filter),
        )
        .route("/api/webhook", get(get_webhook_url).post(update_webhook_url))
        .route_layer(middleware::from_fn_with_state(
            admin_state,
            admin_token_gate,
        ));

    Router::new()
        .route("/healthz", get(health))
        .route("/readyz", get(readiness))
        .route("/api/config", get(app_config))
        .route("/api/version", get(app_version))
        .route("/api/version/updates", get(version_updates))
        .route("/api/changelog", get(app_changelog))
        .merge(admin_api_router)
        .route("/manifest.json", get(pwa_manifest))
        .route("/static/*path", get(static_file))
        .with_state(state)
        // nest_service strips the prefix, so both `/api/v1` and `/api/v1/`
        // reach the sub-application root and unmatched sub-paths get the
        // sub-application's own handling.
        .nest_service("/api/v1", webui_router)
        .nest_service("/openai/api", openai_router)
        .layer(CorsLayer::very_permissive())
        // Outside the CORS layer so preflight responses are stamped too.
        .layer(middleware::from_fn(track_process_time))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http()),
        )
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr;
    let listener = TcpListener::bind(bind_addr).await?;
    info!(
        service = SERVICE_NAME,
        bind_addr = %bind_addr,
        "gateway listening"
    );
    axum::serve(listener, build_router(config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn settings_seed(config: &Config) -> SettingsSeed {
    SettingsSeed {
        default_models: config.default_models.clone(),
        default_prompt_suggestions: config.default_prompt_suggestions.clone(),
        trusted_email_header: config.trusted_email_header.clone(),
        model_filter: ModelFilter {
            enabled: config.model_filter_enabled,
            models: config.model_filter_list.clone(),
        },
        webhook_url: config.webhook_url.clone(),
    }
}

fn openai_catalog(config: &Config) -> Vec<ModelSummary> {
    config
        .openai_models
        .iter()
        .map(|id| ModelSummary::new(id.clone()))
        .collect()
}

async fn track_process_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;

    let elapsed_seconds = started.elapsed().as_secs();
    if let Ok(value) = HeaderValue::from_str(&elapsed_seconds.to_string()) {
        response.headers_mut().insert(HEADER_PROCESS_TIME, value);
    }
    response
}

async fn admin_token_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let presented = bearer_token(request.headers());
    let authorized = presented.as_deref().is_some_and(|token| {
        state
            .config
            .admin_tokens
            .iter()
            .any(|allowed| allowed == token)
    });

    if !authorized {
        return unauthorized_error("Admin credential required.").into_response();
    }

    next.run(request).await
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn map_json_rejection(rejection: JsonRejection) -> (StatusCode, Json<ApiErrorResponse>) {
    validation_error("body", &rejection.body_text())
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = match state.started_at.elapsed() {
        Ok(duration) => duration.as_secs(),
        Err(_) => 0,
    };

    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
    })
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    status: &'static str,
    static_dir: String,
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let static_dir = state.config.static_dir.to_string_lossy().to_string();

    if state.config.static_dir.is_dir() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                static_dir,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                static_dir,
            }),
        )
    }
}

#[derive(Debug, Serialize)]
struct AppConfigResponse {
    status: bool,
    name: String,
    version: &'static str,
    default_locale: String,
    images: bool,
    default_models: Option<String>,
    default_prompt_suggestions: Vec<PromptSuggestion>,
    trusted_header_auth: bool,
    admin_export_enabled: bool,
}

async fn app_config(State(state): State<AppState>) -> Json<AppConfigResponse> {
    Json(AppConfigResponse {
        status: true,
        name: state.config.app_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        default_locale: state
            .config
            .default_locale
            .clone()
            .unwrap_or_else(|| FALLBACK_LOCALE.to_string()),
        images: false,
        default_models: state.settings.default_models().map(str::to_string),
        default_prompt_suggestions: state.settings.default_prompt_suggestions().to_vec(),
        trusted_header_auth: state.settings.trusted_email_header().is_some(),
        admin_export_enabled: state.config.admin_export_enabled,
    })
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    version: &'static str,
}

async fn app_version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn app_changelog(State(state): State<AppState>) -> Json<Map<String, Value>> {
    Json(state.changelog.head(CHANGELOG_ENTRY_LIMIT))
}

#[derive(Debug, Serialize)]
struct VersionUpdatesResponse {
    current: &'static str,
    latest: String,
}

async fn version_updates(
    State(state): State<AppState>,
) -> Result<Json<VersionUpdatesResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    match state.release_client.latest_version().await {
        Ok(latest) => Ok(Json(VersionUpdatesResponse {
            current: env!("CARGO_PKG_VERSION"),
            latest,
        })),
        Err(error) => {
            warn!(%error, "release lookup failed");
            Err(error_response(
                ApiErrorCode::UpstreamUnavailable,
                RELEASE_LOOKUP_UNAVAILABLE_MESSAGE,
            ))
        }
    }
}

#[derive(Debug, Serialize)]
struct ModelFilterResponse {
    enabled: bool,
    models: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ModelFilterForm {
    enabled: bool,
    models: Vec<String>,
}

async fn get_model_filter(State(state): State<AppState>) -> Json<ModelFilterResponse> {
    let filter = state.settings.model_filter().await;
    Json(ModelFilterResponse {
        enabled: filter.enabled,
        models: filter.models,
    })
}

async fn update_model_filter(
    State(state): State<AppState>,
    payload: Result<Json<ModelFilterForm>, JsonRejection>,
) -> Result<Json<ModelFilterResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let Json(form) = payload.map_err(map_json_rejection)?;

    state
        .settings
        .set_model_filter(ModelFilter {
            enabled: form.enabled,
            models: form.models,
        })
        .await;

    let stored = state.settings.model_filter().await;
    Ok(Json(ModelFilterResponse {
        enabled: stored.enabled,
        models: stored.models,
    }))
}

#[derive(Debug, Serialize)]
struct WebhookUrlResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct WebhookUrlForm {
    url: String,
}

async fn get_webhook_url(State(state): State<AppState>) -> Json<WebhookUrlResponse> {
    Json(WebhookUrlResponse {
        url: state.settings.webhook_url().await,
    })
}

async fn update_webhook_url(
    State(state): State<AppState>,
    payload: Result<Json<WebhookUrlForm>, JsonRejection>,
) -> Result<Json<WebhookUrlResponse>, (StatusCode, Json<ApiErrorResponse>)> {
    let Json(form) = payload.map_err(map_json_rejection)?;

    state.settings.set_webhook_url(form.url).await;

    Ok(Json(WebhookUrlResponse {
        url: state.settings.webhook_url().await,
    }))
}

#[derive(Debug, Serialize)]
struct PwaIcon {
    src: &'static str,
    #[serde(rename = "type")]
    icon_type: &'static str,
    sizes: &'static str,
}

#[derive(Debug, Serialize)]
struct PwaManifest {
    name: String,
    short_name: String,
    start_url: &'static str,
    display: &'static str,
    background_color: &'static str,
    theme_color: &'static str,
    orientation: &'static str,
    icons: Vec<PwaIcon>,
}

async fn pwa_manifest(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CACHE_CONTROL, CACHE_MANIFEST)],
        Json(PwaManifest {
            name: state.config.app_name.clone(),
            short_name: state.config.app_name.clone(),
            start_url: "/",
            display: "standalone",
            background_color: PWA_BACKGROUND_COLOR,
            theme_color: PWA_BACKGROUND_COLOR,
            orientation: "portrait-primary",
            icons: vec![PwaIcon {
                src: "/static/favicon.png",
                icon_type: "image/png",
                sizes: "512x512",
            }],
        }),
    )
}

async fn static_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ApiErrorResponse>)> {
    let relative_path = normalize_static_path(&path)
        .ok_or_else(|| static_not_found(format!("Static file '{}' was not found.", path)))?;

    let file_path = state.config.static_dir.join(&relative_path);
    if !file_path.is_file() {
        return Err(static_not_found(format!(
            "Static file '{}' was not found.",
            relative_path
        )));
    }

    let cache_control = if is_hashed_asset_path(&relative_path) {
        CACHE_IMMUTABLE_ONE_YEAR
    } else {
        CACHE_SHORT_LIVED
    };

    let response = build_static_response(&file_path, cache_control)
        .await
        .map_err(map_static_error)?;
    Ok(response)
}

async fn build_static_response(
    file_path: &FsPath,
    cache_control: &'static str,
) -> Result<Response, StaticResponseError> {
    let bytes = tokio::fs::read(file_path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            StaticResponseError::NotFound(format!(
                "Static file '{}' was not found.",
                file_path.display()
            ))
        } else {
            StaticResponseError::Io(source)
        }
    })?;

    let content_type = mime_guess::from_path(file_path).first_or_octet_stream();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_str(content_type.as_ref())
            .map_err(|_| StaticResponseError::InvalidHeader(content_type.to_string()))?,
    );
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));

    Ok(response)
}

#[derive(Debug, thiserror::Error)]
enum StaticResponseError {
    #[error("{0}")]
    NotFound(String),
    #[error("static file read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid header value '{0}'")]
    InvalidHeader(String),
}

fn map_static_error(error: StaticResponseError) -> (StatusCode, Json<ApiErrorResponse>) {
    match error {
        StaticResponseError::NotFound(message) => static_not_found(message),
        StaticResponseError::Io(_) | StaticResponseError::InvalidHeader(_) => {
            error_response_with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorCode::StaticAssetError,
                "Failed to serve static file.".to_string(),
            )
        }
    }
}

fn static_not_found(message: String) -> (StatusCode, Json<ApiErrorResponse>) {
    not_found_error(message)
}

fn normalize_static_path(path: &str) -> Option<String> {
    let trimmed = path.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let mut normalized_parts = Vec::new();
    for part in trimmed.split('/') {
        let segment = part.trim();
        if segment.is_empty() || segment == "." || segment == ".." {
            return None;
        }
        normalized_parts.push(segment);
    }

    Some(normalized_parts.join("/"))
}

fn is_hashed_asset_path(path: &str) -> bool {
    let Some(file_name) = FsPath::new(path)
        .file_name()
        .and_then(|value| value.to_str())
    else {
        return false;
    };

    let Some((stem, _ext)) = file_name.rsplit_once('.') else {
        return false;
    };

    let Some((_, hash_part)) = stem.rsplit_once('-') else {
        return false;
    };

    hash_part.len() >= 8 && hash_part.chars().all(|char| char.is_ascii_alphanumeric())
}

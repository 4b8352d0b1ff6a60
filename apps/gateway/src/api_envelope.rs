use std::collections::HashMap;

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

pub type ApiErrorTuple = (StatusCode, Json<ApiErrorResponse>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    InvalidRequest,
    Unauthorized,
    NotFound,
    UpstreamUnavailable,
    StaticAssetError,
    InternalError,
}

impl ApiErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::StaticAssetError => "static_asset_error",
            Self::InternalError => "internal_error",
        }
    }

    pub const fn default_status(self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::StaticAssetError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub message: String,
    pub error: ApiErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<HashMap<String, Vec<String>>>,
}

pub fn error_response(code: ApiErrorCode, message: impl Into<String>) -> ApiErrorTuple {
    error_response_with_status(code.default_status(), code, message)
}

pub fn error_response_with_status(
    status: StatusCode,
    code: ApiErrorCode,
    message: impl Into<String>,
) -> ApiErrorTuple {
    error_response_with_fields(status, code, message, None)
}

pub fn error_response_with_fields(
    status: StatusCode,
    code: ApiErrorCode,
    message: impl Into<String>,
    errors: Option<HashMap<String, Vec<String>>>,
) -> ApiErrorTuple {
    let message = message.into();
    (
        status,
        Json(ApiErrorResponse {
            message: message.clone(),
            error: ApiErrorDetail {
                code: code.as_str(),
                message,
            },
            errors,
        }),
    )
}

pub fn validation_error(field: &'static str, message: &str) -> ApiErrorTuple {
    let mut errors = HashMap::new();
    errors.insert(field.to_string(), vec![message.to_string()]);

    error_response_with_fields(
        StatusCode::UNPROCESSABLE_ENTITY,
        ApiErrorCode::InvalidRequest,
        message.to_string(),
        Some(errors),
    )
}

pub fn unauthorized_error(message: &str) -> ApiErrorTuple {
    error_response_with_status(
        StatusCode::UNAUTHORIZED,
        ApiErrorCode::Unauthorized,
        message.to_string(),
    )
}

pub fn not_found_error(message: impl Into<String>) -> ApiErrorTuple {
    error_response_with_status(StatusCode::NOT_FOUND, ApiErrorCode::NotFound, message)
}

/// Mapping from gateway error codes to the status and error label the
/// legacy Python service used for the same failure, kept as a compatibility
/// reference for client authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMatrixEntry {
    pub code: &'static str,
    pub status: u16,
    pub legacy_equivalent: &'static str,
}

const API_ERROR_MATRIX: [ApiErrorMatrixEntry; 6] = [
    ApiErrorMatrixEntry {
        code: "invalid_request",
        status: 422,
        legacy_equivalent: "request_validation_error",
    },
    ApiErrorMatrixEntry {
        code: "unauthorized",
        status: 401,
        legacy_equivalent: "http_401_detail",
    },
    ApiErrorMatrixEntry {
        code: "not_found",
        status: 404,
        legacy_equivalent: "http_404_detail",
    },
    ApiErrorMatrixEntry {
        code: "upstream_unavailable",
        status: 503,
        legacy_equivalent: "rate_limit_exceeded",
    },
    ApiErrorMatrixEntry {
        code: "static_asset_error",
        status: 500,
        legacy_equivalent: "static_file_error",
    },
    ApiErrorMatrixEntry {
        code: "internal_error",
        status: 500,
        legacy_equivalent: "http_500_detail",
    },
];

pub fn api_error_matrix() -> &'static [ApiErrorMatrixEntry] {
    &API_ERROR_MATRIX
}

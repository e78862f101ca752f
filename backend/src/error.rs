//! Error handling for the winter service backend
//!
//! Provides consistent error responses in English and German

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug, Clone)]
pub enum AppError {
    // Location errors
    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),

    // Weather errors
    #[error("Weather provider {provider} failed: {message}")]
    ProviderError { provider: String, message: String },

    #[error("All weather providers are unavailable")]
    AllProvidersUnavailable,

    // Map errors
    #[error("Map SDK failed to load: {0}")]
    SdkLoadError(String),

    #[error("Area capture requires a resolved location")]
    NoAnchor,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_de: String,
    },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: &str, message_de: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_de: message_de.to_string(),
        }
    }

    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        AppError::ProviderError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_de: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::NotFound(query) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("No location found for '{}'", query),
                    message_de: format!("Kein Ort gefunden für '{}'", query),
                    field: None,
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "PERMISSION_DENIED".to_string(),
                    message_en: "Location access was denied".to_string(),
                    message_de: "Der Zugriff auf den Standort wurde verweigert".to_string(),
                    field: None,
                },
            ),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "LOCATION_UNAVAILABLE".to_string(),
                    message_en: format!("Location unavailable: {}", msg),
                    message_de: "Der Standort ist derzeit nicht verfügbar".to_string(),
                    field: None,
                },
            ),
            AppError::ProviderError { provider, .. } => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "PROVIDER_ERROR".to_string(),
                    message_en: format!("Service provider {} failed", provider),
                    message_de: format!("Der Dienst {} ist fehlgeschlagen", provider),
                    field: None,
                },
            ),
            AppError::AllProvidersUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "WEATHER_SERVICE_UNAVAILABLE".to_string(),
                    message_en: "Weather data is temporarily unavailable".to_string(),
                    message_de: "Wetterdaten sind vorübergehend nicht verfügbar".to_string(),
                    field: None,
                },
            ),
            AppError::SdkLoadError(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "MAP_UNAVAILABLE".to_string(),
                    message_en: "The map could not be loaded".to_string(),
                    message_de: "Die Karte konnte nicht geladen werden".to_string(),
                    field: None,
                },
            ),
            AppError::NoAnchor => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "NO_ANCHOR".to_string(),
                    message_en: "Enter an address before drawing the area".to_string(),
                    message_de: "Bitte zuerst eine Adresse eingeben".to_string(),
                    field: None,
                },
            ),
            AppError::Validation {
                field,
                message,
                message_de,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_de: message_de.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message_en: msg.clone(),
                    message_de: format!("Ungültiger Zustandswechsel: {}", msg),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_de: format!("Konfigurationsfehler: {}", msg),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_de: "Interner Serverfehler".to_string(),
                    field: None,
                },
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

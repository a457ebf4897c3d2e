//! Configuration endpoints
//!
//! `POST /api/config` is how the web client provisions credentials: the
//! config is validated, persisted owner-only, and the collaborator clients
//! are rebuilt in place so no restart is needed.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::ApiState;
use crate::config::{file, Config};

/// Build config router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(get_config))
        .route("/", post(save_config))
        .with_state(state)
}

/// Get the stored configuration
async fn get_config(State(state): State<Arc<ApiState>>) -> Result<Json<Config>, ConfigError> {
    match state.config().await {
        Some(config) => Ok(Json(config)),
        None => Err(ConfigError::NotFound),
    }
}

/// Save a configuration
///
/// All required fields must be present; the file is written with owner-only
/// permissions and the collaborator clients are rebuilt immediately.
async fn save_config(
    State(state): State<Arc<ApiState>>,
    Json(config): Json<Config>,
) -> Result<Json<Config>, ConfigError> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        return Err(ConfigError::MissingFields(missing));
    }

    file::save(&state.config_path, &config)
        .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

    state
        .apply_config(config.clone())
        .await
        .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

    tracing::info!(path = %state.config_path.display(), "configuration saved");
    Ok(Json(config))
}

/// Config API errors
#[derive(Debug)]
pub enum ConfigError {
    NotFound,
    MissingFields(Vec<&'static str>),
    SaveFailed(String),
}

impl IntoResponse for ConfigError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                "not_found",
                "Configuration not found".to_string(),
            ),
            Self::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                "missing_fields",
                format!("Missing required configuration fields: {}", fields.join(", ")),
            ),
            Self::SaveFailed(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "save_failed", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}

//! User profile endpoints
//!
//! Profiles are replaced wholesale on POST and PUT, matching how the web
//! client submits the whole editor form.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::db::UserProfile;
use crate::Error;

/// Build users router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(get_profile))
        .route("/", post(save_profile))
        .route("/", put(save_profile))
        .with_state(state)
}

#[derive(Deserialize)]
struct ProfileQuery {
    id: Option<String>,
}

/// Fetch a profile by id
async fn get_profile(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<UserProfile>, UserError> {
    let Some(id) = query.id else {
        return Err(UserError::BadRequest("User ID is required".to_string()));
    };

    match state.users.find(&id)? {
        Some(profile) => Ok(Json(profile)),
        None => Err(UserError::NotFound),
    }
}

/// Create or replace a profile
async fn save_profile(
    State(state): State<Arc<ApiState>>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<UserProfile>, UserError> {
    let saved = state.users.save(profile)?;
    tracing::debug!(user_id = %saved.id, "profile saved");
    Ok(Json(saved))
}

/// User API errors
#[derive(Debug)]
pub enum UserError {
    NotFound,
    BadRequest(String),
    Internal(String),
}

impl From<Error> for UserError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(_) => Self::NotFound,
            // Validation failures surface as config errors from the repo
            Error::Config(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for UserError {
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
                "Profile not found".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
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

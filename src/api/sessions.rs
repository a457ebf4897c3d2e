//! Session document endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::db::{CreateSession, InterviewSession, SessionUpdate};
use crate::Error;

/// Build sessions router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(list_sessions))
        .route("/", post(create_session))
        .route("/", put(update_session))
        .route("/", delete(delete_session))
        .route("/{id}", get(get_session))
        .route("/{id}", put(update_session_by_id))
        .route("/{id}", delete(delete_session_by_id))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    user_id: Option<String>,
}

/// List a user's sessions, newest first
async fn list_sessions(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<InterviewSession>>, SessionError> {
    let Some(user_id) = query.user_id else {
        return Err(SessionError::BadRequest("User ID is required".to_string()));
    };

    let sessions = state.sessions.list_for_user(&user_id)?;
    Ok(Json(sessions))
}

/// Create a session
async fn create_session(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<CreateSession>,
) -> Result<Json<InterviewSession>, SessionError> {
    let session = state.sessions.create(request)?;
    tracing::debug!(session_id = %session.id, "session created");
    Ok(Json(session))
}

/// Body of the collection-level PUT: the id travels inline
#[derive(Deserialize)]
struct UpdateRequest {
    id: String,
    #[serde(flatten)]
    update: SessionUpdate,
}

/// Update a session (id in the body)
async fn update_session(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<InterviewSession>, SessionError> {
    apply_update(&state, &request.id, request.update)
}

/// Update a session (id in the path)
async fn update_session_by_id(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(update): Json<SessionUpdate>,
) -> Result<Json<InterviewSession>, SessionError> {
    apply_update(&state, &id, update)
}

fn apply_update(
    state: &ApiState,
    id: &str,
    update: SessionUpdate,
) -> Result<Json<InterviewSession>, SessionError> {
    match state.sessions.update(id, update)? {
        Some(session) => Ok(Json(session)),
        None => Err(SessionError::NotFound),
    }
}

#[derive(Deserialize)]
struct DeleteQuery {
    id: Option<String>,
}

/// Delete response
#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

/// Delete a session (id in the query string)
async fn delete_session(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, SessionError> {
    let Some(id) = query.id else {
        return Err(SessionError::BadRequest("Session ID is required".to_string()));
    };
    apply_delete(&state, &id)
}

/// Delete a session (id in the path)
async fn delete_session_by_id(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, SessionError> {
    apply_delete(&state, &id)
}

fn apply_delete(state: &ApiState, id: &str) -> Result<Json<DeleteResponse>, SessionError> {
    // Repeat deletes 404: the row is gone, not "already succeeded"
    if state.sessions.delete(id)? {
        tracing::debug!(session_id = %id, "session deleted");
        Ok(Json(DeleteResponse { success: true }))
    } else {
        Err(SessionError::NotFound)
    }
}

/// Fetch a session document
async fn get_session(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<InterviewSession>, SessionError> {
    match state.sessions.get(&id)? {
        Some(session) => Ok(Json(session)),
        None => Err(SessionError::NotFound),
    }
}

/// Session API errors
#[derive(Debug)]
pub enum SessionError {
    NotFound,
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<Error> for SessionError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound(_) => Self::NotFound,
            Error::Flow(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for SessionError {
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
                "Session not found".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
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

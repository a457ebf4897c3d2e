//! Interviewer endpoints: turn generation and scoring

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::db::UserProfile;
use crate::flow::{InterviewContext, Interviewer, InterviewScore, InterviewerTurn, QaPair};
use crate::Error;

/// Build interview router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(next_turn))
        .route("/score", post(score))
        .with_state(state)
}

/// Generate the next interviewer turn from a recorded answer
///
/// Multipart fields: `audio` (required), `jobDescription`,
/// `previousQuestions` (JSON array of Q&A pairs), `userProfile` (JSON).
async fn next_turn(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<InterviewerTurn>, InterviewError> {
    let gemini = state
        .gemini()
        .await
        .ok_or(InterviewError::NotConfigured("Gemini not configured"))?;

    let mut audio: Option<Vec<u8>> = None;
    let mut mime = "audio/webm".to_string();
    let mut job_description = String::new();
    let mut history: Vec<QaPair> = Vec::new();
    let mut profile: Option<UserProfile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| InterviewError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "audio" => {
                if let Some(content_type) = field.content_type() {
                    mime = content_type.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| InterviewError::BadRequest(format!("invalid audio field: {e}")))?;
                audio = Some(bytes.to_vec());
            }
            "jobDescription" => {
                job_description = field
                    .text()
                    .await
                    .map_err(|e| InterviewError::BadRequest(e.to_string()))?;
            }
            "previousQuestions" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| InterviewError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    history = serde_json::from_str(&text).map_err(|e| {
                        InterviewError::BadRequest(format!("invalid previousQuestions: {e}"))
                    })?;
                }
            }
            "userProfile" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| InterviewError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    profile = Some(serde_json::from_str(&text).map_err(|e| {
                        InterviewError::BadRequest(format!("invalid userProfile: {e}"))
                    })?);
                }
            }
            _ => {}
        }
    }

    let audio = audio.ok_or(InterviewError::BadRequest("No audio provided".to_string()))?;
    if audio.is_empty() {
        return Err(InterviewError::BadRequest("No audio provided".to_string()));
    }

    let turn = gemini
        .next_turn(
            &audio,
            &mime,
            InterviewContext {
                job_description: &job_description,
                history: &history,
                profile: profile.as_ref(),
            },
        )
        .await
        .map_err(InterviewError::from)?;

    Ok(Json(turn))
}

/// Scoring request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub questions: Vec<QaPair>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

/// Score a completed interview transcript
async fn score(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<InterviewScore>, InterviewError> {
    let gemini = state
        .gemini()
        .await
        .ok_or(InterviewError::NotConfigured("Gemini not configured"))?;

    if request.questions.is_empty() {
        return Err(InterviewError::BadRequest(
            "No questions to score".to_string(),
        ));
    }

    let score = gemini
        .evaluate(InterviewContext {
            job_description: &request.job_description,
            history: &request.questions,
            profile: request.user_profile.as_ref(),
        })
        .await
        .map_err(InterviewError::from)?;

    Ok(Json(score))
}

/// Interview API errors
#[derive(Debug)]
pub enum InterviewError {
    NotConfigured(&'static str),
    BadRequest(String),
    MalformedOutput(String),
    GenerationFailed(String),
}

impl From<Error> for InterviewError {
    fn from(err: Error) -> Self {
        match err {
            Error::Parse(msg) => Self::MalformedOutput(msg),
            other => Self::GenerationFailed(other.to_string()),
        }
    }
}

impl IntoResponse for InterviewError {
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
            Self::NotConfigured(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "not_configured",
                msg.to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::MalformedOutput(msg) => (
                StatusCode::BAD_GATEWAY,
                "malformed_output",
                msg,
            ),
            Self::GenerationFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "generation_failed",
                msg,
            ),
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

//! Interview session lifecycle state machine
//!
//! The spoken Q&A loop is modeled as an explicit finite-state machine with
//! named stages and a single advance entry point, so every suspension point
//! (remote call, playback, settle delay) is auditable and testable. The
//! collaborators sit behind traits: [`Interviewer`] generates turns and
//! scores, [`Voice`] synthesizes and plays speech to completion.
//!
//! Error policy: a failure at any step propagates to the caller without
//! retry or rollback. The stage never regresses; the next user action simply
//! retries from wherever the flow stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::{SessionRepo, SessionStatus, UserProfile};
use crate::{Error, Result};

/// Placeholder answer written while the remote call is in flight
pub const PROCESSING_PLACEHOLDER: &str = "Processing...";

/// The fixed first question of every interview
pub const INTRO_QUESTION: &str = "Could you please introduce yourself?";

/// The fixed closing message before scoring
pub const CLOSING_MESSAGE: &str = "Thank you for participating in this interview. \
    You've answered all my questions. I'll now provide you with feedback on your performance.";

/// Default number of questions asked per interview (intro included)
pub const DEFAULT_QUESTION_QUOTA: usize = 10;

/// Default pause between the interviewer's reaction and the next question.
/// Pacing only, not a correctness requirement.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);

/// Lifecycle stage of an interview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intro,
    Questions,
    Outro,
    Completed,
}

/// A question/answer pair sent to the interviewer as context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// One interviewer turn: a reaction to the candidate's answer plus the
/// follow-up question, and optionally the model's transcript of the answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewerTurn {
    pub response: String,
    pub next_question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Final evaluation of an interview
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewScore {
    pub score: f64,
    pub feedback: String,
    #[serde(default)]
    pub question_feedback: serde_json::Value,
}

/// Context handed to the interviewer on every call
#[derive(Debug, Clone, Copy)]
pub struct InterviewContext<'a> {
    pub job_description: &'a str,
    pub history: &'a [QaPair],
    pub profile: Option<&'a UserProfile>,
}

/// Generates interviewer turns and the final evaluation
#[async_trait]
pub trait Interviewer: Send + Sync {
    /// Produce the reaction and follow-up question for a recorded answer
    async fn next_turn(
        &self,
        audio: &[u8],
        mime: &str,
        ctx: InterviewContext<'_>,
    ) -> Result<InterviewerTurn>;

    /// Score the full transcript
    async fn evaluate(&self, ctx: InterviewContext<'_>) -> Result<InterviewScore>;
}

/// Speaks text and returns only once playback has fully completed
#[async_trait]
pub trait Voice: Send {
    async fn say(&mut self, text: &str) -> Result<()>;
}

/// Cancellation token tied to a flow's lifetime
///
/// Checked at every step boundary; once cancelled, the flow mutates no
/// further state even if an in-flight remote call resolves afterwards.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Tuning knobs for the flow
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Total questions asked before the outro, intro question included
    pub question_quota: usize,
    /// Pause between reaction and follow-up question
    pub settle_delay: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            question_quota: DEFAULT_QUESTION_QUOTA,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Result of advancing the flow by one user action
#[derive(Debug, Clone)]
pub enum Advance {
    /// The interview continues with this question
    NextQuestion(String),
    /// The interview completed; the caller should navigate to results
    Finished { score: f64, feedback: String },
}

/// The coordinating state machine for one interview session
pub struct InterviewFlow<I, V> {
    sessions: SessionRepo,
    session_id: String,
    profile: Option<UserProfile>,
    interviewer: I,
    voice: V,
    config: FlowConfig,
    stage: Stage,
    cancel: CancelToken,
}

impl<I: Interviewer, V: Voice> InterviewFlow<I, V> {
    /// Create a flow for an existing session
    pub fn new(sessions: SessionRepo, session_id: impl Into<String>, interviewer: I, voice: V) -> Self {
        Self {
            sessions,
            session_id: session_id.into(),
            profile: None,
            interviewer,
            voice,
            config: FlowConfig::default(),
            stage: Stage::Intro,
            cancel: CancelToken::new(),
        }
    }

    /// Attach the candidate's profile for context
    #[must_use]
    pub fn with_profile(mut self, profile: Option<UserProfile>) -> Self {
        self.profile = profile;
        self
    }

    /// Override the default quota and settle delay
    #[must_use]
    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Current stage
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Token that cancels this flow (e.g. when the user navigates away)
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Start the interview: mark the session in progress, append the fixed
    /// intro question, and speak the greeting
    ///
    /// Returns the greeting text.
    ///
    /// # Errors
    ///
    /// Returns error if called outside the intro stage, the session is
    /// missing, or a collaborator fails
    pub async fn begin(&mut self) -> Result<String> {
        if self.stage != Stage::Intro {
            return Err(Error::Flow("interview has already started".to_string()));
        }
        self.ensure_active()?;

        let session = self
            .sessions
            .get(&self.session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {}", self.session_id)))?;

        self.sessions
            .set_status(&self.session_id, SessionStatus::InProgress)?;
        self.sessions.add_question(&self.session_id, INTRO_QUESTION)?;
        self.stage = Stage::Questions;

        let greeting = format!(
            "Hello! I'm your AI interviewer today. I'll be asking you questions about {}. \
             Before we begin, could you please introduce yourself?",
            session.job_title
        );

        tracing::info!(session_id = %self.session_id, "interview started");
        self.voice.say(&greeting).await?;

        Ok(greeting)
    }

    /// Advance the flow with one recorded answer
    ///
    /// This is the single entry point for the questions stage: it writes the
    /// placeholder answer, asks the interviewer for a turn, overwrites the
    /// placeholder with the transcript, speaks the reaction, waits the
    /// settle delay, and then either appends and speaks the next question or
    /// runs the outro and scoring.
    ///
    /// # Errors
    ///
    /// Returns error if the interview is not awaiting an answer, if the
    /// flow was cancelled, or if a collaborator fails (in which case no
    /// further state is mutated and the caller may retry)
    pub async fn submit_answer(&mut self, audio: &[u8], mime: &str) -> Result<Advance> {
        self.ensure_active()?;
        match self.stage {
            Stage::Questions => {}
            // A failed closing message or scoring call leaves the stage at
            // Outro; the next user action re-runs the outro rather than
            // recording another answer.
            Stage::Outro => return self.finish().await,
            Stage::Intro | Stage::Completed => {
                return Err(Error::Flow(format!(
                    "not awaiting an answer (stage {:?})",
                    self.stage
                )));
            }
        }

        let session = self
            .sessions
            .get(&self.session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {}", self.session_id)))?;

        let current = session.questions.last().cloned();
        if let Some(current) = &current {
            self.sessions
                .set_answer(&self.session_id, &current.id, PROCESSING_PLACEHOLDER)?;
        }

        let history: Vec<QaPair> = session
            .questions
            .iter()
            .map(|q| QaPair {
                question: q.question.clone(),
                answer: q.answer.clone().unwrap_or_default(),
            })
            .collect();

        let turn = self
            .interviewer
            .next_turn(
                audio,
                mime,
                InterviewContext {
                    job_description: &session.job_description,
                    history: &history,
                    profile: self.profile.as_ref(),
                },
            )
            .await?;
        self.ensure_active()?;

        if let (Some(current), Some(transcript)) = (&current, turn.transcript.as_deref()) {
            self.sessions
                .set_answer(&self.session_id, &current.id, transcript)?;
        }

        self.voice.say(&turn.response).await?;
        self.ensure_active()?;

        tokio::time::sleep(self.config.settle_delay).await;
        self.ensure_active()?;

        let asked = self.sessions.question_count(&self.session_id)?;
        if asked >= self.config.question_quota {
            return self.finish().await;
        }

        self.sessions
            .add_question(&self.session_id, &turn.next_question)?;
        self.voice.say(&turn.next_question).await?;

        Ok(Advance::NextQuestion(turn.next_question))
    }

    /// Outro: speak the closing message, score the transcript, and complete
    /// the session
    ///
    /// Re-entrant: a failure partway through leaves the stage at Outro and
    /// the session untouched, so the caller can run it again.
    async fn finish(&mut self) -> Result<Advance> {
        self.stage = Stage::Outro;
        tracing::info!(session_id = %self.session_id, "question quota reached, scoring");

        self.voice.say(CLOSING_MESSAGE).await?;
        self.ensure_active()?;

        let session = self
            .sessions
            .get(&self.session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {}", self.session_id)))?;

        let history: Vec<QaPair> = session
            .questions
            .iter()
            .map(|q| QaPair {
                question: q.question.clone(),
                answer: q.answer.clone().unwrap_or_default(),
            })
            .collect();

        let score = self
            .interviewer
            .evaluate(InterviewContext {
                job_description: &session.job_description,
                history: &history,
                profile: self.profile.as_ref(),
            })
            .await?;
        self.ensure_active()?;

        let question_feedback =
            (!score.question_feedback.is_null()).then_some(&score.question_feedback);
        self.sessions
            .complete(&self.session_id, score.score, &score.feedback, question_feedback)?;
        self.stage = Stage::Completed;

        tracing::info!(
            session_id = %self.session_id,
            score = score.score,
            "interview completed"
        );

        Ok(Advance::Finished {
            score: score.score,
            feedback: score.feedback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_turn_wire_format() {
        let turn: InterviewerTurn = serde_json::from_str(
            r#"{"response":"Thanks!","nextQuestion":"Tell me about X","transcript":"I did Y"}"#,
        )
        .unwrap();
        assert_eq!(turn.next_question, "Tell me about X");
        assert_eq!(turn.transcript.as_deref(), Some("I did Y"));

        // transcript is optional
        let turn: InterviewerTurn =
            serde_json::from_str(r#"{"response":"Ok","nextQuestion":"Next?"}"#).unwrap();
        assert!(turn.transcript.is_none());
    }

    #[test]
    fn test_turn_requires_both_fields() {
        assert!(serde_json::from_str::<InterviewerTurn>(r#"{"response":"Thanks!"}"#).is_err());
    }
}

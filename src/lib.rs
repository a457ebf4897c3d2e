//! Interview Gateway - mock interview practice against an AI interviewer
//!
//! This library provides the core functionality for the gateway:
//! - Interview session lifecycle state machine (intro, questions, outro)
//! - Gemini question-generation and scoring client
//! - ElevenLabs text-to-speech client plus local capture/playback
//! - Session and profile persistence
//! - HTTP API for web clients
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Clients                           │
//! │     Web UI (HTTP API)   │   Local practice loop     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               Interview Gateway                      │
//! │   Flow FSM  │  Capture/Playback  │  Repos  │  API   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │             External collaborators                   │
//! │   Gemini (questions, scoring)  │  ElevenLabs (TTS)  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod daemon;
pub mod db;
pub mod error;
pub mod flow;
pub mod gemini;
pub mod voice;

pub use config::Config;
pub use daemon::PracticeSession;
pub use db::{DbConn, DbPool};
pub use error::{Error, Result};
pub use flow::{
    Advance, CancelToken, FlowConfig, InterviewFlow, InterviewContext, InterviewScore, Interviewer,
    InterviewerTurn, QaPair, Stage, Voice,
};
pub use gemini::GeminiClient;
pub use voice::TextToSpeech;

//! Local practice loop
//!
//! Runs a full interview in the terminal against the local microphone and
//! speakers: the interviewer speaks through the output device, the candidate
//! answers push-to-talk style with the Enter key, and Ctrl-C cancels the
//! flow between steps.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::db::{CreateSession, DbPool, SessionRepo, UserRepo};
use crate::flow::{Advance, FlowConfig, InterviewFlow};
use crate::gemini::GeminiClient;
use crate::voice::{AnswerRecorder, AudioPlayback, Speaker, TextToSpeech};
use crate::{Error, Result};

/// Options for a practice run
#[derive(Debug, Clone, Default)]
pub struct PracticeOptions {
    pub job_title: String,
    pub job_description: String,
    pub company_name: String,
    /// Profile to hand the interviewer as context, if one is saved
    pub user_id: Option<String>,
    pub questions: Option<usize>,
}

/// A terminal-driven practice interview
pub struct PracticeSession {
    sessions: SessionRepo,
    users: UserRepo,
    gemini: GeminiClient,
    tts: TextToSpeech,
}

impl PracticeSession {
    /// Build a practice session from config
    ///
    /// # Errors
    ///
    /// Returns error if the config is missing API keys
    pub fn new(pool: DbPool, config: &Config) -> Result<Self> {
        let gemini = GeminiClient::new(config.gemini_api_key.clone())?;
        let tts = TextToSpeech::with_voice(
            config.eleven_labs_api_key.clone(),
            config.voice.tts_voice.clone(),
            config.voice.tts_model.clone(),
        )?;

        Ok(Self {
            sessions: SessionRepo::new(pool.clone()),
            users: UserRepo::new(pool),
            gemini,
            tts,
        })
    }

    /// Run one interview to completion (or cancellation)
    ///
    /// # Errors
    ///
    /// Returns error if audio devices cannot be opened or a collaborator
    /// fails mid-interview
    pub async fn run(self, opts: PracticeOptions) -> Result<()> {
        let profile = match &opts.user_id {
            Some(id) => self.users.find(id)?,
            None => None,
        };

        let session = self.sessions.create(CreateSession {
            id: None,
            user_id: opts.user_id.unwrap_or_else(|| "local".to_string()),
            job_title: opts.job_title,
            job_description: opts.job_description,
            company_name: opts.company_name,
        })?;

        let mut recorder = AnswerRecorder::new()?;
        let playback = AudioPlayback::new()?;
        let speaker = Speaker::new(self.tts, playback);

        let mut flow_config = FlowConfig::default();
        if let Some(questions) = opts.questions {
            flow_config.question_quota = questions;
        }

        let mut flow = InterviewFlow::new(self.sessions.clone(), &session.id, self.gemini, speaker)
            .with_profile(profile)
            .with_config(flow_config);

        let cancel = flow.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("cancelling interview");
                cancel.cancel();
            }
        });

        println!("Interview session {}", session.id);
        let greeting = flow.begin().await?;
        println!("\nInterviewer: {greeting}");

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();

        loop {
            println!("\nPress Enter to start recording your answer...");
            if stdin.next_line().await?.is_none() {
                return Err(Error::Cancelled);
            }

            recorder.start()?;
            println!("Recording. Press Enter to stop.");
            if stdin.next_line().await?.is_none() {
                return Err(Error::Cancelled);
            }

            let audio = recorder.finish()?;
            tracing::debug!(bytes = audio.len(), "answer recorded");
            println!("Thinking...");

            match flow.submit_answer(&audio, "audio/wav").await {
                Ok(Advance::NextQuestion(question)) => {
                    println!("\nInterviewer: {question}");
                }
                Ok(Advance::Finished { score, feedback }) => {
                    println!("\nInterview complete. Score: {score}/100");
                    println!("\n{feedback}");
                    return Ok(());
                }
                Err(Error::Cancelled) => {
                    println!("\nInterview cancelled.");
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

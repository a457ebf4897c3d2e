//! Interview flow state machine tests
//!
//! The collaborators are scripted mocks, so these tests exercise the
//! ordering and persistence guarantees of the flow without touching the
//! network or audio hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use interview_gateway::db::{self, CreateSession, SessionRepo, SessionStatus};
use interview_gateway::flow::{
    Advance, FlowConfig, InterviewContext, InterviewFlow, InterviewScore, Interviewer,
    InterviewerTurn, Stage, Voice, CLOSING_MESSAGE, INTRO_QUESTION, PROCESSING_PLACEHOLDER,
};
use interview_gateway::{Error, Result};

/// Interviewer that replays a scripted sequence of turns
struct ScriptedInterviewer {
    turns: Mutex<VecDeque<Result<InterviewerTurn>>>,
    score: InterviewScore,
    evaluate_failures: Mutex<usize>,
    evaluations: Arc<Mutex<usize>>,
}

impl ScriptedInterviewer {
    fn new(turns: Vec<Result<InterviewerTurn>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            score: InterviewScore {
                score: 84.0,
                feedback: "Strong communication throughout.".to_string(),
                question_feedback: serde_json::json!([{ "feedback": "good" }]),
            },
            evaluate_failures: Mutex::new(0),
            evaluations: Arc::new(Mutex::new(0)),
        }
    }

    /// Make the first `n` evaluate calls fail
    fn with_failing_evaluations(mut self, n: usize) -> Self {
        self.evaluate_failures = Mutex::new(n);
        self
    }
}

#[async_trait]
impl Interviewer for ScriptedInterviewer {
    async fn next_turn(
        &self,
        _audio: &[u8],
        _mime: &str,
        _ctx: InterviewContext<'_>,
    ) -> Result<InterviewerTurn> {
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Llm("script exhausted".to_string())))
    }

    async fn evaluate(&self, _ctx: InterviewContext<'_>) -> Result<InterviewScore> {
        *self.evaluations.lock().unwrap() += 1;
        let mut failures = self.evaluate_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(Error::Llm("scoring unavailable".to_string()));
        }
        Ok(self.score.clone())
    }
}

/// Voice that records what it was asked to speak
#[derive(Clone, Default)]
struct RecordingVoice {
    spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Voice for RecordingVoice {
    async fn say(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn turn(response: &str, next_question: &str, transcript: Option<&str>) -> Result<InterviewerTurn> {
    Ok(InterviewerTurn {
        response: response.to_string(),
        next_question: next_question.to_string(),
        transcript: transcript.map(ToString::to_string),
    })
}

fn setup_session(repo: &SessionRepo) -> String {
    repo.create(CreateSession {
        id: None,
        user_id: "u1".to_string(),
        job_title: "Backend Engineer".to_string(),
        job_description: "Rust services".to_string(),
        company_name: "Acme".to_string(),
    })
    .unwrap()
    .id
}

fn fast_config(quota: usize) -> FlowConfig {
    FlowConfig {
        question_quota: quota,
        settle_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_begin_marks_in_progress_and_asks_intro() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let voice = RecordingVoice::default();
    let spoken = voice.spoken.clone();
    let mut flow = InterviewFlow::new(repo.clone(), &id, ScriptedInterviewer::new(vec![]), voice);

    let greeting = flow.begin().await.unwrap();

    assert!(greeting.contains("Backend Engineer"));
    assert_eq!(flow.stage(), Stage::Questions);

    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::InProgress);
    assert_eq!(session.questions.len(), 1);
    assert_eq!(session.questions[0].question, INTRO_QUESTION);

    assert_eq!(spoken.lock().unwrap().as_slice(), &[greeting]);
}

#[tokio::test]
async fn test_begin_twice_is_rejected() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let mut flow = InterviewFlow::new(
        repo,
        &id,
        ScriptedInterviewer::new(vec![]),
        RecordingVoice::default(),
    );

    flow.begin().await.unwrap();
    assert!(flow.begin().await.is_err());
}

#[tokio::test]
async fn test_each_turn_appends_exactly_one_question() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let interviewer = ScriptedInterviewer::new(vec![turn(
        "Nice to meet you.",
        "What drew you to backend work?",
        Some("I am a backend engineer."),
    )]);
    let mut flow = InterviewFlow::new(repo.clone(), &id, interviewer, RecordingVoice::default())
        .with_config(fast_config(10));

    flow.begin().await.unwrap();
    let advance = flow.submit_answer(b"fake-audio", "audio/wav").await.unwrap();

    match advance {
        Advance::NextQuestion(question) => {
            assert_eq!(question, "What drew you to backend work?");
        }
        Advance::Finished { .. } => panic!("interview should not be finished"),
    }

    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(session.questions.len(), 2);
    // Placeholder was overwritten with the transcript
    assert_eq!(
        session.questions[0].answer.as_deref(),
        Some("I am a backend engineer.")
    );
    assert!(session.questions[1].answer.is_none());
}

#[tokio::test]
async fn test_turn_without_transcript_keeps_placeholder() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let interviewer =
        ScriptedInterviewer::new(vec![turn("Thanks.", "Tell me about a hard bug.", None)]);
    let mut flow = InterviewFlow::new(repo.clone(), &id, interviewer, RecordingVoice::default())
        .with_config(fast_config(10));

    flow.begin().await.unwrap();
    flow.submit_answer(b"fake-audio", "audio/wav").await.unwrap();

    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(
        session.questions[0].answer.as_deref(),
        Some(PROCESSING_PLACEHOLDER)
    );
}

#[tokio::test]
async fn test_quota_reached_scores_and_completes() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let interviewer = ScriptedInterviewer::new(vec![
        turn("Good.", "Second question?", Some("answer one")),
        turn("Noted.", "never asked", Some("answer two")),
    ]);
    let evaluations = interviewer.evaluations.clone();

    let voice = RecordingVoice::default();
    let spoken = voice.spoken.clone();

    // Quota of 2: the intro question plus one follow-up
    let mut flow =
        InterviewFlow::new(repo.clone(), &id, interviewer, voice).with_config(fast_config(2));

    flow.begin().await.unwrap();
    flow.submit_answer(b"a1", "audio/wav").await.unwrap();
    let advance = flow.submit_answer(b"a2", "audio/wav").await.unwrap();

    match advance {
        Advance::Finished { score, feedback } => {
            assert!((score - 84.0).abs() < f64::EPSILON);
            assert_eq!(feedback, "Strong communication throughout.");
        }
        Advance::NextQuestion(_) => panic!("expected the interview to finish"),
    }

    assert_eq!(flow.stage(), Stage::Completed);
    assert_eq!(*evaluations.lock().unwrap(), 1);

    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(session.questions.len(), 2);
    assert_eq!(session.score, Some(84.0));
    assert!(session.completed_at.is_some());
    assert!(session.question_feedback.is_some());

    // The closing message was spoken before scoring
    assert!(spoken
        .lock()
        .unwrap()
        .iter()
        .any(|line| line == CLOSING_MESSAGE));
}

#[tokio::test]
async fn test_completed_interview_rejects_more_audio() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let interviewer = ScriptedInterviewer::new(vec![turn("Ok.", "unused", Some("answer"))]);
    let mut flow = InterviewFlow::new(repo.clone(), &id, interviewer, RecordingVoice::default())
        .with_config(fast_config(1));

    flow.begin().await.unwrap();
    let advance = flow.submit_answer(b"a1", "audio/wav").await.unwrap();
    assert!(matches!(advance, Advance::Finished { .. }));

    let before = repo.question_count(&id).unwrap();
    assert!(flow.submit_answer(b"more", "audio/wav").await.is_err());
    assert_eq!(repo.question_count(&id).unwrap(), before);
}

#[tokio::test]
async fn test_failed_turn_appends_nothing_and_allows_retry() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let interviewer = ScriptedInterviewer::new(vec![
        Err(Error::Parse("no JSON object in model output".to_string())),
        turn("Better.", "Next question?", Some("retried answer")),
    ]);
    let mut flow = InterviewFlow::new(repo.clone(), &id, interviewer, RecordingVoice::default())
        .with_config(fast_config(10));

    flow.begin().await.unwrap();

    let err = flow.submit_answer(b"a1", "audio/wav").await.unwrap_err();
    assert!(matches!(err, Error::Parse(_)));

    // No question appended, stage unchanged, retry works
    assert_eq!(repo.question_count(&id).unwrap(), 1);
    assert_eq!(flow.stage(), Stage::Questions);

    let advance = flow.submit_answer(b"a1", "audio/wav").await.unwrap();
    assert!(matches!(advance, Advance::NextQuestion(_)));
    assert_eq!(repo.question_count(&id).unwrap(), 2);

    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(
        session.questions[0].answer.as_deref(),
        Some("retried answer")
    );
}

#[tokio::test]
async fn test_failed_scoring_leaves_outro_retryable() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let interviewer = ScriptedInterviewer::new(vec![turn("Ok.", "unused", Some("answer"))])
        .with_failing_evaluations(1);
    let evaluations = interviewer.evaluations.clone();
    let mut flow = InterviewFlow::new(repo.clone(), &id, interviewer, RecordingVoice::default())
        .with_config(fast_config(1));

    flow.begin().await.unwrap();

    let err = flow.submit_answer(b"a1", "audio/wav").await.unwrap_err();
    assert!(matches!(err, Error::Llm(_)));
    assert_eq!(flow.stage(), Stage::Outro);

    // The session is untouched by the failed scoring pass
    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::InProgress);
    assert!(session.score.is_none());

    // The next user action re-runs the outro and completes
    let advance = flow.submit_answer(b"ignored", "audio/wav").await.unwrap();
    match advance {
        Advance::Finished { score, .. } => assert!((score - 84.0).abs() < f64::EPSILON),
        Advance::NextQuestion(_) => panic!("expected the interview to finish"),
    }
    assert_eq!(flow.stage(), Stage::Completed);
    assert_eq!(*evaluations.lock().unwrap(), 2);

    let session = repo.get(&id).unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Completed);
    assert_eq!(repo.question_count(&id).unwrap(), 1);
}

#[tokio::test]
async fn test_cancelled_flow_mutates_nothing() {
    let pool = db::init_memory().unwrap();
    let repo = SessionRepo::new(pool);
    let id = setup_session(&repo);

    let interviewer = ScriptedInterviewer::new(vec![turn("Ok.", "unused", Some("answer"))]);
    let mut flow = InterviewFlow::new(repo.clone(), &id, interviewer, RecordingVoice::default())
        .with_config(fast_config(10));

    flow.begin().await.unwrap();
    let before = repo.get(&id).unwrap().unwrap();

    flow.cancel_token().cancel();
    let err = flow.submit_answer(b"a1", "audio/wav").await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));

    let after = repo.get(&id).unwrap().unwrap();
    assert_eq!(after.questions.len(), before.questions.len());
    assert_eq!(after.questions[0].answer, before.questions[0].answer);
}

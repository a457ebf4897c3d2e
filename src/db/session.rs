//! Interview session repository
//!
//! Sessions are stored as a row plus an append-only child table of
//! questions ordered by position; the full document is assembled on read.
//! The two lifecycle invariants live here: `questions` only grows while a
//! session is open, and completion (with its score/feedback assignment)
//! happens exactly once.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// Interview session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "not-started")]
    NotStarted,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl SessionStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "not-started" => Some(Self::NotStarted),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A single interviewer question and the candidate's answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// A mock interview session document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub id: String,
    pub user_id: String,
    pub job_title: String,
    pub job_description: String,
    pub company_name: String,
    pub status: SessionStatus,
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_feedback: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Payload for creating a session
///
/// The client may supply its own id; otherwise one is generated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    #[serde(default)]
    pub id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub company_name: String,
}

/// Partial update for a session
///
/// `questions` entries either append (`question` set) or record an answer
/// (`id` + `answer` set), mirroring how the web client drives the loop.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub company_name: Option<String>,
    pub status: Option<SessionStatus>,
    pub score: Option<f64>,
    pub feedback: Option<String>,
    pub question_feedback: Option<serde_json::Value>,
    pub completed_at: Option<DateTime<Utc>>,
    pub questions: Option<Vec<QuestionPatch>>,
}

/// One entry of a `SessionUpdate.questions` list
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionPatch {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// Session repository
#[derive(Clone)]
pub struct SessionRepo {
    pool: DbPool,
}

impl SessionRepo {
    /// Create a new session repository
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<super::DbConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }

    /// Create a session
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn create(&self, req: CreateSession) -> Result<InterviewSession> {
        let conn = self.conn()?;

        let id = req.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        conn.execute(
            "INSERT INTO sessions (id, user_id, job_title, job_description, company_name, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &id,
                &req.user_id,
                &req.job_title,
                &req.job_description,
                &req.company_name,
                SessionStatus::NotStarted.as_str(),
                now.to_rfc3339(),
            ],
        )?;

        Ok(InterviewSession {
            id,
            user_id: req.user_id,
            job_title: req.job_title,
            job_description: req.job_description,
            company_name: req.company_name,
            status: SessionStatus::NotStarted,
            questions: Vec::new(),
            score: None,
            feedback: None,
            question_feedback: None,
            created_at: now,
            completed_at: None,
        })
    }

    /// Get a session by id with its questions
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn get(&self, id: &str) -> Result<Option<InterviewSession>> {
        let conn = self.conn()?;
        Self::load(&conn, id)
    }

    /// List all sessions for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<InterviewSession>> {
        let conn = self.conn()?;

        let ids: Vec<String> = {
            let mut stmt = conn.prepare(
                "SELECT id FROM sessions WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map([user_id], |row| row.get(0))?;
            rows.filter_map(std::result::Result::ok).collect()
        };

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = Self::load(&conn, &id)? {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }

    /// Apply a partial update; returns the updated session or `None` if
    /// the id is unknown
    ///
    /// # Errors
    ///
    /// Returns error if the session is already completed or a database
    /// operation fails
    pub fn update(&self, id: &str, update: SessionUpdate) -> Result<Option<InterviewSession>> {
        let conn = self.conn()?;

        let Some(status) = Self::status_of(&conn, id)? else {
            return Ok(None);
        };

        // Completed sessions are immutable; score/feedback assignment goes
        // through complete() exactly once.
        if status == SessionStatus::Completed {
            return Err(Error::Flow(format!("session {id} is already completed")));
        }

        if let Some(job_title) = &update.job_title {
            conn.execute("UPDATE sessions SET job_title = ?1 WHERE id = ?2", params![job_title, id])?;
        }
        if let Some(job_description) = &update.job_description {
            conn.execute(
                "UPDATE sessions SET job_description = ?1 WHERE id = ?2",
                params![job_description, id],
            )?;
        }
        if let Some(company_name) = &update.company_name {
            conn.execute(
                "UPDATE sessions SET company_name = ?1 WHERE id = ?2",
                params![company_name, id],
            )?;
        }
        if let Some(status) = update.status {
            if status == SessionStatus::Completed {
                // Completion via PUT stamps the timestamp, honoring a
                // client-supplied one if present
                let completed_at = update.completed_at.unwrap_or_else(Utc::now);
                conn.execute(
                    "UPDATE sessions SET status = ?1, completed_at = ?2 WHERE id = ?3",
                    params![status.as_str(), completed_at.to_rfc3339(), id],
                )?;
            } else {
                conn.execute(
                    "UPDATE sessions SET status = ?1 WHERE id = ?2",
                    params![status.as_str(), id],
                )?;
            }
        }
        if let Some(score) = update.score {
            conn.execute("UPDATE sessions SET score = ?1 WHERE id = ?2", params![score, id])?;
        }
        if let Some(feedback) = &update.feedback {
            conn.execute("UPDATE sessions SET feedback = ?1 WHERE id = ?2", params![feedback, id])?;
        }
        if let Some(question_feedback) = &update.question_feedback {
            conn.execute(
                "UPDATE sessions SET question_feedback = ?1 WHERE id = ?2",
                params![serde_json::to_string(question_feedback)?, id],
            )?;
        }

        drop(conn);

        if let Some(patches) = update.questions {
            for patch in patches {
                match (patch.id, patch.question, patch.answer) {
                    // Append a new question (client may supply the id)
                    (id_opt, Some(text), answer) => {
                        let question = self.add_question_with_id(id, id_opt, &text)?;
                        if let Some(answer) = answer {
                            self.set_answer(id, &question.id, &answer)?;
                        }
                    }
                    // Record an answer on an existing question
                    (Some(question_id), None, Some(answer)) => {
                        self.set_answer(id, &question_id, &answer)?;
                    }
                    _ => {
                        return Err(Error::Flow(
                            "question entry needs either a question text or an id and answer"
                                .to_string(),
                        ))
                    }
                }
            }
        }

        self.get(id)
    }

    /// Delete a session and its questions
    ///
    /// Returns `false` if the id was unknown (so a repeated delete 404s).
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        // ON DELETE CASCADE is declared but SQLite only honors it with
        // foreign keys enabled, so delete the children explicitly.
        conn.execute("DELETE FROM questions WHERE session_id = ?1", [id])?;
        let deleted = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Append a question to an open session
    ///
    /// # Errors
    ///
    /// Returns error if the session is missing or already completed
    pub fn add_question(&self, session_id: &str, text: &str) -> Result<Question> {
        self.add_question_with_id(session_id, None, text)
    }

    fn add_question_with_id(
        &self,
        session_id: &str,
        id: Option<String>,
        text: &str,
    ) -> Result<Question> {
        let conn = self.conn()?;

        let status = Self::status_of(&conn, session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
        if status == SessionStatus::Completed {
            return Err(Error::Flow(format!(
                "session {session_id} is already completed"
            )));
        }

        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let position: i64 = conn.query_row(
            "SELECT COUNT(*) FROM questions WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO questions (id, session_id, position, question, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&id, session_id, position, text, Utc::now().to_rfc3339()],
        )?;

        Ok(Question {
            id,
            question: text.to_string(),
            answer: None,
        })
    }

    /// Set (or overwrite) the answer on a question
    ///
    /// # Errors
    ///
    /// Returns error if the question does not exist in the session
    pub fn set_answer(&self, session_id: &str, question_id: &str, answer: &str) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE questions SET answer = ?1 WHERE id = ?2 AND session_id = ?3",
            params![answer, question_id, session_id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!(
                "question {question_id} in session {session_id}"
            )));
        }

        Ok(())
    }

    /// Set the lifecycle status of a session
    ///
    /// # Errors
    ///
    /// Returns error if the session does not exist
    pub fn set_status(&self, session_id: &str, status: SessionStatus) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE sessions SET status = ?1 WHERE id = ?2",
            params![status.as_str(), session_id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("session {session_id}")));
        }

        Ok(())
    }

    /// Complete a session: store score and feedback, mark completed
    ///
    /// This is the one-time assignment; a second call is a flow error.
    ///
    /// # Errors
    ///
    /// Returns error if the session is missing or already completed
    pub fn complete(
        &self,
        session_id: &str,
        score: f64,
        feedback: &str,
        question_feedback: Option<&serde_json::Value>,
    ) -> Result<InterviewSession> {
        let conn = self.conn()?;

        let status = Self::status_of(&conn, session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))?;
        if status == SessionStatus::Completed {
            return Err(Error::Flow(format!(
                "session {session_id} is already completed"
            )));
        }

        let question_feedback = question_feedback
            .map(serde_json::to_string)
            .transpose()?;

        conn.execute(
            "UPDATE sessions
             SET status = ?1, score = ?2, feedback = ?3, question_feedback = ?4, completed_at = ?5
             WHERE id = ?6",
            params![
                SessionStatus::Completed.as_str(),
                score,
                feedback,
                question_feedback,
                Utc::now().to_rfc3339(),
                session_id,
            ],
        )?;

        Self::load(&conn, session_id)?
            .ok_or_else(|| Error::NotFound(format!("session {session_id}")))
    }

    /// Number of questions asked so far
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn question_count(&self, session_id: &str) -> Result<usize> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM questions WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// The most recently appended question, if any
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn last_question(&self, session_id: &str) -> Result<Option<Question>> {
        let conn = self.conn()?;

        let question = conn
            .query_row(
                "SELECT id, question, answer FROM questions
                 WHERE session_id = ?1 ORDER BY position DESC LIMIT 1",
                [session_id],
                |row| {
                    Ok(Question {
                        id: row.get(0)?,
                        question: row.get(1)?,
                        answer: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(question)
    }

    fn status_of(conn: &Connection, id: &str) -> Result<Option<SessionStatus>> {
        let status: Option<String> = conn
            .query_row("SELECT status FROM sessions WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(status.and_then(|s| SessionStatus::from_str(&s)))
    }

    fn load(conn: &Connection, id: &str) -> Result<Option<InterviewSession>> {
        let session = conn
            .query_row(
                "SELECT id, user_id, job_title, job_description, company_name, status,
                        score, feedback, question_feedback, created_at, completed_at
                 FROM sessions WHERE id = ?1",
                [id],
                |row| {
                    Ok(InterviewSession {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        job_title: row.get(2)?,
                        job_description: row.get(3)?,
                        company_name: row.get(4)?,
                        status: SessionStatus::from_str(&row.get::<_, String>(5)?)
                            .unwrap_or(SessionStatus::NotStarted),
                        score: row.get(6)?,
                        feedback: row.get(7)?,
                        question_feedback: row
                            .get::<_, Option<String>>(8)?
                            .and_then(|s| serde_json::from_str(&s).ok()),
                        created_at: parse_datetime(&row.get::<_, String>(9)?),
                        completed_at: row
                            .get::<_, Option<String>>(10)?
                            .map(|s| parse_datetime(&s)),
                        questions: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut session) = session else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, question, answer FROM questions
             WHERE session_id = ?1 ORDER BY position ASC",
        )?;
        let questions = stmt
            .query_map([id], |row| {
                Ok(Question {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                })
            })?
            .filter_map(std::result::Result::ok)
            .collect();

        session.questions = questions;
        Ok(Some(session))
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> SessionRepo {
        SessionRepo::new(init_memory().unwrap())
    }

    fn new_session(repo: &SessionRepo) -> InterviewSession {
        repo.create(CreateSession {
            user_id: "user-1".to_string(),
            job_title: "Backend Engineer".to_string(),
            job_description: "Rust services".to_string(),
            company_name: "Acme".to_string(),
            ..CreateSession::default()
        })
        .unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let repo = setup();
        let session = new_session(&repo);

        let loaded = repo.get(&session.id).unwrap().unwrap();
        assert_eq!(loaded.job_title, "Backend Engineer");
        assert_eq!(loaded.status, SessionStatus::NotStarted);
        assert!(loaded.questions.is_empty());
    }

    #[test]
    fn test_client_supplied_id_is_honored() {
        let repo = setup();
        let session = repo
            .create(CreateSession {
                id: Some("my-id".to_string()),
                user_id: "user-1".to_string(),
                ..CreateSession::default()
            })
            .unwrap();
        assert_eq!(session.id, "my-id");
    }

    #[test]
    fn test_questions_are_append_only_and_ordered() {
        let repo = setup();
        let session = new_session(&repo);

        repo.add_question(&session.id, "First?").unwrap();
        repo.add_question(&session.id, "Second?").unwrap();
        repo.add_question(&session.id, "Third?").unwrap();

        let loaded = repo.get(&session.id).unwrap().unwrap();
        let texts: Vec<&str> = loaded.questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(texts, vec!["First?", "Second?", "Third?"]);
        assert_eq!(repo.question_count(&session.id).unwrap(), 3);
    }

    #[test]
    fn test_answer_overwrite() {
        let repo = setup();
        let session = new_session(&repo);
        let question = repo.add_question(&session.id, "Tell me about X").unwrap();

        repo.set_answer(&session.id, &question.id, "Processing...").unwrap();
        repo.set_answer(&session.id, &question.id, "I built X in Rust").unwrap();

        let loaded = repo.get(&session.id).unwrap().unwrap();
        assert_eq!(
            loaded.questions[0].answer.as_deref(),
            Some("I built X in Rust")
        );
    }

    #[test]
    fn test_complete_is_exactly_once() {
        let repo = setup();
        let session = new_session(&repo);
        repo.add_question(&session.id, "Q").unwrap();

        let completed = repo.complete(&session.id, 82.0, "Solid answers", None).unwrap();
        assert_eq!(completed.status, SessionStatus::Completed);
        assert_eq!(completed.score, Some(82.0));
        assert!(completed.completed_at.is_some());

        assert!(repo.complete(&session.id, 10.0, "again", None).is_err());
    }

    #[test]
    fn test_update_to_completed_stamps_timestamp() {
        let repo = setup();
        let session = new_session(&repo);

        let updated = repo
            .update(
                &session.id,
                SessionUpdate {
                    status: Some(SessionStatus::Completed),
                    score: Some(82.0),
                    feedback: Some("Solid".to_string()),
                    ..SessionUpdate::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, SessionStatus::Completed);
        assert!(updated.completed_at.is_some());
    }

    #[test]
    fn test_update_honors_client_completed_at() {
        let repo = setup();
        let session = new_session(&repo);

        let stamp: DateTime<Utc> = "2026-08-24T10:00:00Z".parse().unwrap();
        let updated = repo
            .update(
                &session.id,
                SessionUpdate {
                    status: Some(SessionStatus::Completed),
                    completed_at: Some(stamp),
                    ..SessionUpdate::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.completed_at, Some(stamp));
    }

    #[test]
    fn test_no_appends_after_completion() {
        let repo = setup();
        let session = new_session(&repo);
        repo.add_question(&session.id, "Q").unwrap();
        repo.complete(&session.id, 50.0, "ok", None).unwrap();

        assert!(repo.add_question(&session.id, "Another?").is_err());
        assert_eq!(repo.question_count(&session.id).unwrap(), 1);
    }

    #[test]
    fn test_delete_and_repeat_delete() {
        let repo = setup();
        let session = new_session(&repo);

        assert!(repo.delete(&session.id).unwrap());
        assert!(repo.get(&session.id).unwrap().is_none());
        assert!(!repo.delete(&session.id).unwrap());
        assert!(repo.list_for_user("user-1").unwrap().is_empty());
    }

    #[test]
    fn test_update_question_patches() {
        let repo = setup();
        let session = new_session(&repo);

        // Append with a client-supplied id
        let updated = repo
            .update(
                &session.id,
                SessionUpdate {
                    questions: Some(vec![QuestionPatch {
                        id: Some("q-1".to_string()),
                        question: Some("Why Rust?".to_string()),
                        answer: None,
                    }]),
                    ..SessionUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.questions.len(), 1);
        assert_eq!(updated.questions[0].id, "q-1");

        // Record an answer on it
        let updated = repo
            .update(
                &session.id,
                SessionUpdate {
                    questions: Some(vec![QuestionPatch {
                        id: Some("q-1".to_string()),
                        question: None,
                        answer: Some("Memory safety".to_string()),
                    }]),
                    ..SessionUpdate::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.questions[0].answer.as_deref(),
            Some("Memory safety")
        );
    }

    #[test]
    fn test_update_unknown_id_is_none() {
        let repo = setup();
        assert!(repo
            .update("nope", SessionUpdate::default())
            .unwrap()
            .is_none());
    }
}

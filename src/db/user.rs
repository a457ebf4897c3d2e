//! User profile repository
//!
//! Profiles are replaced wholesale on save; the full document is kept as a
//! JSON column with name/email duplicated for validation and listing.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

/// A work experience entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub current: bool,
    #[serde(default)]
    pub description: String,
}

/// An education entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
}

/// A project entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A certification entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A user's profile document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// User profile repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<super::DbConn> {
        self.pool.get().map_err(|e| Error::Database(e.to_string()))
    }

    /// Save a profile, replacing any existing document wholesale
    ///
    /// Generates an id when the profile has none. `name` and `email` must
    /// be non-empty.
    ///
    /// # Errors
    ///
    /// Returns error on validation failure or database failure
    pub fn save(&self, mut profile: UserProfile) -> Result<UserProfile> {
        if profile.name.trim().is_empty() || profile.email.trim().is_empty() {
            return Err(Error::Config(
                "profile name and email must be non-empty".to_string(),
            ));
        }

        if profile.id.is_empty() {
            profile.id = Uuid::new_v4().to_string();
            profile.created_at = Utc::now();
        }
        profile.updated_at = Utc::now();

        let conn = self.conn()?;
        let document = serde_json::to_string(&profile)?;

        conn.execute(
            "INSERT INTO users (id, name, email, profile, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 profile = excluded.profile,
                 updated_at = excluded.updated_at",
            params![
                &profile.id,
                &profile.name,
                &profile.email,
                &document,
                profile.created_at.to_rfc3339(),
                profile.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(profile)
    }

    /// Find a profile by id (returns `None` if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn()?;

        let document: Option<String> = conn
            .query_row("SELECT profile FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;

        match document {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    /// Whether a profile exists for the given id
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn exists(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;

        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |row| row.get(0))
            .optional()?;

        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> UserRepo {
        UserRepo::new(init_memory().unwrap())
    }

    fn sample() -> UserProfile {
        UserProfile {
            id: String::new(),
            name: "Dana".to_string(),
            email: "dana@example.com".to_string(),
            phone: None,
            location: None,
            summary: Some("Engineer".to_string()),
            skills: vec!["rust".to_string(), "sql".to_string()],
            experience: Vec::new(),
            education: Vec::new(),
            projects: Vec::new(),
            certifications: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_generates_id_and_round_trips() {
        let repo = setup();
        let saved = repo.save(sample()).unwrap();
        assert!(!saved.id.is_empty());

        let found = repo.find(&saved.id).unwrap().unwrap();
        assert_eq!(found.name, "Dana");
        assert_eq!(found.skills, vec!["rust", "sql"]);
    }

    #[test]
    fn test_save_replaces_wholesale() {
        let repo = setup();
        let saved = repo.save(sample()).unwrap();

        let mut replacement = sample();
        replacement.id.clone_from(&saved.id);
        replacement.name = "Dana Q".to_string();
        replacement.skills = vec!["go".to_string()];
        repo.save(replacement).unwrap();

        let found = repo.find(&saved.id).unwrap().unwrap();
        assert_eq!(found.name, "Dana Q");
        assert_eq!(found.skills, vec!["go"]);
    }

    #[test]
    fn test_empty_name_or_email_rejected() {
        let repo = setup();

        let mut profile = sample();
        profile.name = " ".to_string();
        assert!(repo.save(profile).is_err());

        let mut profile = sample();
        profile.email = String::new();
        assert!(repo.save(profile).is_err());
    }

    #[test]
    fn test_find_missing_is_none() {
        let repo = setup();
        assert!(repo.find("ghost").unwrap().is_none());
        assert!(!repo.exists("ghost").unwrap());
    }
}

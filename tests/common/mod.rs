//! Shared test utilities

use interview_gateway::api::ApiServer;
use interview_gateway::{db, DbPool};
use tempfile::TempDir;

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Build a test API router backed by a temporary config path
///
/// The `TempDir` must be kept alive for the duration of the test.
#[must_use]
pub fn test_router(db: DbPool) -> (axum::Router, TempDir) {
    let dir = TempDir::new().expect("failed to create tempdir");
    let config_path = dir.path().join("config.json");
    let server = ApiServer::new(db, config_path, 0);
    (server.router(), dir)
}

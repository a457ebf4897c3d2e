//! HTTP API server for the interview gateway
//!
//! Routes mirror what the web client calls: `/api/config` for credentials,
//! `/api/gemini` for interviewer turns, `/api/elevenlabs` for speech, and
//! `/api/sessions` + `/api/users` for persistence. Collaborator clients are
//! rebuilt whenever a new config is saved, so the server never needs a
//! restart after `POST /api/config`.

pub mod config;
pub mod health;
pub mod interview;
pub mod sessions;
pub mod users;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::{DbPool, SessionRepo, UserRepo};
use crate::gemini::GeminiClient;
use crate::voice::TextToSpeech;
use crate::Result;

/// Shared state for API handlers
pub struct ApiState {
    pub db: DbPool,
    pub sessions: SessionRepo,
    pub users: UserRepo,
    /// Where `POST /api/config` persists credentials
    pub config_path: PathBuf,
    config: RwLock<Option<Config>>,
    gemini: RwLock<Option<Arc<GeminiClient>>>,
    tts: RwLock<Option<Arc<TextToSpeech>>>,
}

impl ApiState {
    /// Create state with no config applied yet
    #[must_use]
    pub fn new(db: DbPool, config_path: PathBuf) -> Self {
        Self {
            sessions: SessionRepo::new(db.clone()),
            users: UserRepo::new(db.clone()),
            db,
            config_path,
            config: RwLock::new(None),
            gemini: RwLock::new(None),
            tts: RwLock::new(None),
        }
    }

    /// Apply a config: rebuild the Gemini and TTS clients from its keys
    ///
    /// # Errors
    ///
    /// Returns error if either API key is empty
    pub async fn apply_config(&self, config: Config) -> Result<()> {
        let gemini = GeminiClient::new(config.gemini_api_key.clone())?;
        let tts = TextToSpeech::with_voice(
            config.eleven_labs_api_key.clone(),
            config.voice.tts_voice.clone(),
            config.voice.tts_model.clone(),
        )?;

        *self.gemini.write().await = Some(Arc::new(gemini));
        *self.tts.write().await = Some(Arc::new(tts));
        *self.config.write().await = Some(config);

        tracing::info!("collaborator clients rebuilt from config");
        Ok(())
    }

    /// Current config, if one has been applied
    pub async fn config(&self) -> Option<Config> {
        self.config.read().await.clone()
    }

    /// Current Gemini client, if configured
    pub async fn gemini(&self) -> Option<Arc<GeminiClient>> {
        self.gemini.read().await.clone()
    }

    /// Current TTS client, if configured
    pub async fn tts(&self) -> Option<Arc<TextToSpeech>> {
        self.tts.read().await.clone()
    }

    /// Whether both collaborator clients are available
    pub async fn is_configured(&self) -> bool {
        self.gemini.read().await.is_some() && self.tts.read().await.is_some()
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Create a server on the given port
    #[must_use]
    pub fn new(db: DbPool, config_path: PathBuf, port: u16) -> Self {
        Self {
            state: Arc::new(ApiState::new(db, config_path)),
            port,
            static_dir: None,
        }
    }

    /// Serve a static web UI from this directory
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Shared handler state
    #[must_use]
    pub fn state(&self) -> Arc<ApiState> {
        self.state.clone()
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .nest("/api/config", config::router(self.state.clone()))
            .nest("/api/gemini", interview::router(self.state.clone()))
            .nest("/api/elevenlabs", voice::router(self.state.clone()))
            .nest("/api/sessions", sessions::router(self.state.clone()))
            .nest("/api/users", users::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir = ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from the frontend
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

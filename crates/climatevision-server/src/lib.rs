//! ClimateVision Server - backend relay and storage API.
//!
//! The server keeps the video provider credential out of the client and
//! hosts the storage and report tables the client writes to.
//!
//! ## Endpoints
//!
//! - `POST /functions/v1/generate-video` - Store an image and animate it
//! - `POST /storage/v1/object/{bucket}/{name}` - Upload an object
//! - `GET /storage/v1/object/public/{bucket}/{name}` - Fetch an object
//! - `POST /rest/v1/reports` - Insert a report row
//! - `GET /rest/v1/reports` - List submitted reports
//! - `GET /health` - Liveness and relay configuration
//!
//! ## Example
//!
//! ```no_run
//! use climatevision_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::new(ServerConfig::default()).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod error;
mod handlers;
pub mod models;
mod relay;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use climatevision_core::generation::{VideoProvider, VideoSettings};
use climatevision_core::providers::FalVideoProvider;
use climatevision_core::ClimateError;
use climatevision_storage::{Database, DEFAULT_BUCKET};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

pub use error::{ApiError, RelayError, Result};
pub use state::AppState;

/// Default server port.
pub const DEFAULT_PORT: u16 = 54321;

/// Default server host (localhost only).
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Environment variable holding the server-side video provider key.
pub const FAL_API_KEY_ENV: &str = "FAL_API_KEY";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1).
    pub host: String,
    /// Port to bind to (default: 54321).
    pub port: u16,
    /// Database path (None = in-memory).
    pub db_path: Option<String>,
    /// Base of public object URLs. Defaults to `http://{host}:{port}`.
    pub public_base_url: Option<String>,
    /// Bucket the relay writes source images to.
    pub bucket: String,
    /// Knobs sent with every relayed video request.
    pub video: VideoSettings,
    /// Override for the provider model path.
    pub fal_model: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db_path: None,
            public_base_url: None,
            bucket: DEFAULT_BUCKET.to_string(),
            video: VideoSettings::default(),
            fal_model: None,
        }
    }
}

impl ServerConfig {
    /// Creates a config with a specific database path.
    pub fn with_db_path(path: impl Into<String>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_video_settings(mut self, video: VideoSettings) -> Self {
        self.video = video;
        self
    }

    pub fn with_fal_model(mut self, model: impl Into<String>) -> Self {
        self.fal_model = Some(model.into());
        self
    }

    /// Base URL the stored objects are served from.
    pub fn base_url(&self) -> String {
        self.public_base_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.host, self.port))
    }
}

/// Server error types.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {0}: {1}")]
    BindError(SocketAddr, std::io::Error),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] climatevision_storage::StorageError),

    /// Provider construction error.
    #[error("provider error: {0}")]
    Provider(#[from] ClimateError),

    /// Server runtime error.
    #[error("server error: {0}")]
    Runtime(String),
}

/// Builds the relay provider from `FAL_API_KEY`, if set.
///
/// Only the presence and length of the key are logged.
pub fn provider_from_env(
    config: &ServerConfig,
) -> std::result::Result<Option<Arc<dyn VideoProvider>>, ServerError> {
    let key = std::env::var(FAL_API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty());

    let Some(key) = key else {
        warn!("{} is not set; relay calls will fail api_key_check", FAL_API_KEY_ENV);
        return Ok(None);
    };
    info!(key_len = key.len(), "Video provider credential loaded");

    let mut provider = FalVideoProvider::new(key.trim())?;
    if let Some(model) = &config.fal_model {
        provider = provider.with_model(model.clone());
    }
    Ok(Some(Arc::new(provider)))
}

/// Builds the API router over the given state.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/functions/v1/generate-video", post(relay::generate_video))
        .route(
            "/storage/v1/object/public/{bucket}/{name}",
            get(handlers::get_public_object),
        )
        .route("/storage/v1/object/{bucket}/{name}", post(handlers::upload_object))
        .route(
            "/rest/v1/reports",
            get(handlers::list_reports).post(handlers::create_report),
        )
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}

/// The HTTP API server.
pub struct Server {
    router: Router,
    addr: SocketAddr,
}

impl Server {
    /// Creates a new server with the given configuration.
    pub async fn new(config: ServerConfig) -> std::result::Result<Self, ServerError> {
        let db = if let Some(ref path) = config.db_path {
            Database::with_path(path)?
        } else {
            Database::in_memory()?
        };

        Self::with_database(config, db)
    }

    /// Creates a server with an existing database.
    pub fn with_database(
        config: ServerConfig,
        db: Database,
    ) -> std::result::Result<Self, ServerError> {
        let mut state = AppState::new(db, config.base_url())
            .with_bucket(config.bucket.clone())
            .with_video_settings(config.video.clone());
        if let Some(provider) = provider_from_env(&config)? {
            state = state.with_video_provider(provider);
        }
        Self::with_state(config, state)
    }

    /// Creates a server with custom application state.
    pub fn with_state(
        config: ServerConfig,
        state: AppState,
    ) -> std::result::Result<Self, ServerError> {
        let router = build_router(state);

        let addr = format!("{}:{}", config.host, config.port)
            .parse()
            .map_err(|e| ServerError::Runtime(format!("invalid address: {}", e)))?;

        Ok(Self { router, addr })
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the server until shutdown.
    pub async fn run(self) -> std::result::Result<(), ServerError> {
        info!("Starting ClimateVision server on {}", self.addr);

        let domain = if self.addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        // Rebind over sockets still in TIME_WAIT.
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        socket
            .bind(&self.addr.into())
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::BindError(self.addr, e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        let std_listener: std::net::TcpListener = socket.into();
        let listener = tokio::net::TcpListener::from_std(std_listener)
            .map_err(|e| ServerError::BindError(self.addr, e))?;

        axum::serve(listener, self.router)
            .await
            .map_err(|e| ServerError::Runtime(e.to_string()))?;

        Ok(())
    }

    /// Returns the router for testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

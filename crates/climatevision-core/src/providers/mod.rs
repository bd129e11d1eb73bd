//! HTTP-backed provider implementations.
//!
//! - [`GeminiImageProvider`] for image effects
//! - [`FalVideoProvider`] for image-to-video, either synchronous or queued
//! - [`RelayVideoProvider`] for video through the backend relay
//!
//! The relay wire types live here so the server speaks the same shapes.

mod fal;
mod gemini;
pub mod relay;

pub use fal::{FalCallStyle, FalVideoProvider, DEFAULT_FAL_MODEL};
pub use gemini::{GeminiImageProvider, DEFAULT_GEMINI_MODEL};
pub use relay::RelayVideoProvider;

use std::time::Duration;

use crate::error::Result;

/// Builds the shared HTTP client used by every provider.
pub(crate) fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(format!("ClimateVision/{}", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Reads the body of a failed response for the error message.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e))
}

/// Local HTTP stand-ins for provider APIs.
#[cfg(test)]
pub(crate) mod stub_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serves the router built from the bound base URL and returns that URL.
    pub(crate) async fn spawn(app: impl FnOnce(String) -> Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let router = app(base.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        base
    }
}

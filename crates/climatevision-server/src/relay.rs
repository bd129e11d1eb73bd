//! The video relay: POST /functions/v1/generate-video.
//!
//! Stateless and single-shot. Each step depends on the one before it:
//!
//! 1. `api_key_check`: the server holds a provider credential
//! 2. `json_parse`: the body is JSON
//! 3. `parameter_validation`: `imageData` and `prompt` are present
//! 4. decode the image and store it under a fresh name
//! 5. build its public URL
//! 6. call the video provider with that URL
//!
//! Failures in steps 4-6 answer 500 with step `execution_error` and the
//! failing stage. Nothing is deduplicated: identical calls store distinct
//! objects and invoke the provider twice.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use climatevision_core::generation::{ImageRef, VideoJob};
use climatevision_core::media::decode_base64;
use climatevision_core::providers::relay::{RelayRequest, RelayResponse, RelayStage};
use climatevision_core::store::{unique_object_name, ObjectStore};
use climatevision_core::ClimateError;
use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::state::AppState;

/// Object name prefix for relayed source images.
const OBJECT_PREFIX: &str = "climate-image";

pub async fn generate_video(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<Json<RelayResponse>, RelayError> {
    let result = run(&state, &body).await;
    if let Err(e) = &result {
        error!(
            step = e.step().as_str(),
            stage = e.body.stage.map(|s| s.as_str()),
            status = e.status.as_u16(),
            "Relay failed: {}",
            e.body.error
        );
    }
    result.map(Json)
}

async fn run(state: &AppState, body: &[u8]) -> std::result::Result<RelayResponse, RelayError> {
    info!(body_len = body.len(), "Relay request received");

    let Some(provider) = state.video_provider.as_ref() else {
        return Err(RelayError::api_key_missing());
    };
    info!(step = "api_key_check", "Provider credential present");

    let request: RelayRequest =
        serde_json::from_slice(body).map_err(|e| RelayError::invalid_json(e.to_string()))?;

    let received = request.received();
    let Some((image_data, prompt)) = request.required_fields() else {
        warn!(
            has_image_data = received.has_image_data,
            has_prompt = received.has_prompt,
            "Missing required parameters"
        );
        return Err(RelayError::missing_parameters(received));
    };
    info!(
        step = "parameter_validation",
        prompt_len = prompt.len(),
        "Parameters validated"
    );

    let bytes = decode_base64(image_data)
        .ok()
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            RelayError::execution(
                RelayStage::ImageDecode,
                "Image processing failed: imageData is not valid base64",
            )
        })?;

    // SQLite writes block, so the upload runs off the async workers.
    let bucket = state.bucket.clone();
    let object_name = unique_object_name(OBJECT_PREFIX, "png");
    let stored = tokio::task::spawn_blocking(move || {
        bucket.put_object(&object_name, &bytes, "image/png")
    })
    .await
    .map_err(|e| ClimateError::Storage(e.to_string()))
    .and_then(|stored| stored)
    .map_err(|e| {
        RelayError::execution(
            RelayStage::ImageUpload,
            format!("Failed to upload image to storage: {}", e),
        )
    })?;
    info!(
        stage = "image_upload",
        object_name = %stored.name,
        size = stored.size,
        "Source image stored"
    );

    let image_url = state.bucket.public_url(&stored.name).map_err(|e| {
        RelayError::execution(
            RelayStage::PublicUrl,
            format!("Could not build a public URL for the stored image: {}", e),
        )
    })?;
    info!(stage = "public_url", url = %image_url, "Public URL generated");

    let job = VideoJob::new(ImageRef::Url(image_url.clone()), prompt)
        .with_settings(state.video_settings.clone());
    info!(
        provider = provider.name(),
        duration = job.settings.duration.as_str(),
        audio = job.settings.generate_audio,
        resolution = job.settings.resolution.as_str(),
        "Starting video generation"
    );

    let video = provider
        .generate(&job)
        .await
        .map_err(|e| RelayError::execution(RelayStage::VideoGeneration, e.to_string()))?;

    info!(video_url = %video.url, "Video generation completed");

    Ok(RelayResponse {
        success: true,
        video_url: video.url,
        image_url,
    })
}

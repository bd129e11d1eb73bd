//! Generation clients.
//!
//! Each client validates input locally, performs a single provider call,
//! and converts every failure into a [`ClimateError`](crate::ClimateError).
//! Nothing is retried automatically.

mod image;
mod video;

pub use image::{CandidatePart, ImageCandidate, ImageGenerator, ImageProvider};
pub use video::{
    GeneratedVideo, ImageRef, Resolution, VideoClient, VideoDuration, VideoJob, VideoMode,
    VideoProvider, VideoSettings, DEFAULT_VIDEO_TIMEOUT,
};

#[cfg(test)]
pub(crate) use image::tests::ScriptedImageProvider;

//! Conversions between raw bytes, base64, data URLs, and object URLs.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;

use crate::error::{ClimateError, Result};

/// Scheme prefix for object URLs minted by [`ObjectUrlRegistry`].
pub const OBJECT_URL_PREFIX: &str = "blob:climatevision/";

/// Maximum slug length used in download file names.
const SLUG_MAX_LEN: usize = 48;

/// Bitmap types accepted as generation input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageKind {
    /// Detects the image type from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Result<Self> {
        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => Ok(ImageKind::Png),
            Ok(ImageFormat::Jpeg) => Ok(ImageKind::Jpeg),
            Ok(ImageFormat::WebP) => Ok(ImageKind::Webp),
            Ok(ImageFormat::Gif) => Ok(ImageKind::Gif),
            Ok(other) => Err(ClimateError::Validation(format!(
                "Unsupported image type {:?}. Use PNG, JPEG, WebP, or GIF.",
                other
            ))),
            Err(_) => Err(ClimateError::Validation(
                "The selected file is not a recognizable image".to_string(),
            )),
        }
    }

    /// Returns the MIME type.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
        }
    }

    /// Returns the conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
        }
    }

    /// Parses a MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/webp" => Some(ImageKind::Webp),
            "image/gif" => Some(ImageKind::Gif),
            _ => None,
        }
    }
}

/// Bytes paired with their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaBlob")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl MediaBlob {
    /// Creates a blob with an explicit MIME type.
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Creates an image blob, rejecting unsupported bitmap types.
    pub fn image(bytes: Vec<u8>) -> Result<Self> {
        let kind = ImageKind::sniff(&bytes)?;
        Ok(Self::new(bytes, kind.mime()))
    }

    /// Reads an image file from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ClimateError::Validation(format!("Could not read {}: {}", path.display(), e))
        })?;
        Self::image(bytes)
    }

    /// Decodes a data URL or bare base64 payload into an image blob.
    pub fn from_base64(input: &str) -> Result<Self> {
        let bytes = decode_base64(input)?;
        Self::image(bytes)
    }

    /// Returns the payload as standard base64.
    pub fn to_base64(&self) -> String {
        encode_base64(&self.bytes)
    }

    /// Returns the payload as a `data:` URL.
    pub fn to_data_url(&self) -> String {
        DataUrl::new(self.mime.clone(), self.bytes.clone()).to_string()
    }

    /// Returns the image kind, if the MIME type is a supported bitmap.
    pub fn image_kind(&self) -> Option<ImageKind> {
        ImageKind::from_mime(&self.mime)
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Encodes bytes as standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard base64. A `data:` URL prefix is stripped first.
pub fn decode_base64(input: &str) -> Result<Vec<u8>> {
    let payload = match input.split_once(',') {
        Some((head, rest)) if head.starts_with("data:") => rest,
        _ => input,
    };

    STANDARD
        .decode(payload.trim())
        .map_err(|e| ClimateError::Validation(format!("Invalid base64 image data: {}", e)))
}

/// A parsed `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub data: Vec<u8>,
}

impl DataUrl {
    pub fn new(mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            data,
        }
    }

    /// Parses a base64 data URL.
    pub fn parse(input: &str) -> Result<Self> {
        let rest = input
            .strip_prefix("data:")
            .ok_or_else(|| ClimateError::Validation("Not a data URL".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ClimateError::Validation("Data URL has no payload".to_string()))?;
        let mime = meta.strip_suffix(";base64").ok_or_else(|| {
            ClimateError::Validation("Only base64 data URLs are supported".to_string())
        })?;

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| ClimateError::Validation(format!("Invalid base64 image data: {}", e)))?;

        let mime = if mime.is_empty() {
            "application/octet-stream".to_string()
        } else {
            mime.to_string()
        };

        Ok(Self { mime, data })
    }

    pub fn into_blob(self) -> MediaBlob {
        MediaBlob::new(self.data, self.mime)
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }
}

/// Session-scoped table of displayable object URLs.
///
/// Each handle stays resolvable until it is revoked, either explicitly or
/// when the owning session is torn down.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<RwLock<HashMap<String, MediaBlob>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a blob and returns its object URL.
    pub fn create(&self, blob: MediaBlob) -> String {
        let mut entries = self.entries.write().unwrap();
        loop {
            let url = format!("{}{:016x}", OBJECT_URL_PREFIX, rand::random::<u64>());
            if !entries.contains_key(&url) {
                entries.insert(url.clone(), blob);
                return url;
            }
        }
    }

    /// Looks up the blob behind an object URL.
    pub fn resolve(&self, url: &str) -> Option<MediaBlob> {
        self.entries.read().unwrap().get(url).cloned()
    }

    /// Releases an object URL. Returns false if it was unknown.
    pub fn revoke(&self, url: &str) -> bool {
        self.entries.write().unwrap().remove(url).is_some()
    }

    /// Releases every object URL and returns how many were live.
    pub fn revoke_all(&self) -> usize {
        let mut entries = self.entries.write().unwrap();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the file name offered when a generated image is downloaded.
pub fn download_file_name(effect: &str, timestamp_millis: i64, kind: ImageKind) -> String {
    let mut slug = String::with_capacity(effect.len());
    for c in effect.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug: String = slug.trim_matches('-').chars().take(SLUG_MAX_LEN).collect();
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        format!("climate-effect-{}.{}", timestamp_millis, kind.extension())
    } else {
        format!(
            "climate-effect-{}-{}.{}",
            slug,
            timestamp_millis,
            kind.extension()
        )
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Smallest valid PNG signature plus IHDR header start.
    pub const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00,
    ];

    pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

    pub fn png_blob() -> super::MediaBlob {
        super::MediaBlob::new(PNG_BYTES.to_vec(), "image/png")
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use tokio_test::assert_err;

    #[test]
    fn sniff_supported_types() {
        assert_eq!(ImageKind::sniff(PNG_BYTES).unwrap(), ImageKind::Png);
        assert_eq!(ImageKind::sniff(JPEG_BYTES).unwrap(), ImageKind::Jpeg);
        assert_eq!(ImageKind::sniff(b"GIF89a\x01\x00").unwrap(), ImageKind::Gif);
    }

    #[test]
    fn sniff_rejects_non_images() {
        let err = ImageKind::sniff(b"hello world, not an image").unwrap_err();
        assert!(matches!(err, ClimateError::Validation(_)));
    }

    #[test]
    fn decode_accepts_data_url_and_bare_payload() {
        let encoded = encode_base64(PNG_BYTES);
        let data_url = format!("data:image/png;base64,{}", encoded);

        assert_eq!(decode_base64(&encoded).unwrap(), PNG_BYTES);
        assert_eq!(decode_base64(&data_url).unwrap(), PNG_BYTES);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert_err!(decode_base64("data:image/png;base64,@@@"));
    }

    #[test]
    fn data_url_parse_keeps_mime() {
        let url = png_blob().to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let parsed = DataUrl::parse(&url).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert_eq!(parsed.data, PNG_BYTES);
    }

    #[test]
    fn data_url_requires_base64_marker() {
        assert_err!(DataUrl::parse("data:text/plain,hello"));
        assert_err!(DataUrl::parse("https://example.com/a.png"));
    }

    #[test]
    fn blob_from_base64_sniffs_type() {
        let blob = MediaBlob::from_base64(&encode_base64(JPEG_BYTES)).unwrap();
        assert_eq!(blob.mime, "image/jpeg");
        assert_eq!(blob.image_kind(), Some(ImageKind::Jpeg));
    }

    #[test]
    fn registry_lifecycle() {
        let registry = ObjectUrlRegistry::new();
        let a = registry.create(png_blob());
        let b = registry.create(png_blob());

        assert!(a.starts_with(OBJECT_URL_PREFIX));
        assert_ne!(a, b);
        assert_eq!(registry.resolve(&a).unwrap().bytes, PNG_BYTES);

        assert!(registry.revoke(&a));
        assert!(!registry.revoke(&a));
        assert!(registry.resolve(&a).is_none());

        assert_eq!(registry.revoke_all(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn download_name_is_slugged() {
        let name = download_file_name("Wildfire spreading!! across", 1700, ImageKind::Png);
        assert_eq!(name, "climate-effect-wildfire-spreading-across-1700.png");

        let bare = download_file_name("***", 5, ImageKind::Jpeg);
        assert_eq!(bare, "climate-effect-5.jpg");
    }
}

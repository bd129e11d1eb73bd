//! Named object bucket with public URLs.

use climatevision_core::store::{ObjectStore, StoredObject};
use climatevision_core::ClimateError;
use tracing::debug;

use crate::database::Database;

/// Bucket used for uploaded and generated images.
pub const DEFAULT_BUCKET: &str = "generated-images";

/// One bucket in the object table, addressed through a public base URL.
#[derive(Clone)]
pub struct Bucket {
    db: Database,
    name: String,
    public_base_url: String,
}

impl Bucket {
    pub fn new(db: Database, name: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parses a public URL produced by this bucket back into an object name.
    pub fn object_name_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(&self.public_base_url)?
            .strip_prefix("/storage/v1/object/public/")?
            .strip_prefix(&self.name)?
            .strip_prefix('/')
            .filter(|name| !name.is_empty())
    }
}

impl ObjectStore for Bucket {
    fn put_object(
        &self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> climatevision_core::Result<StoredObject> {
        let record = self.db.put_object(&self.name, name, content_type, bytes)?;
        debug!(bucket = %self.name, object_name = %name, size = record.size, "Object stored");

        Ok(StoredObject {
            bucket: record.bucket,
            name: record.name,
            content_type: record.content_type,
            size: record.size,
            checksum: record.sha256,
        })
    }

    fn public_url(&self, name: &str) -> climatevision_core::Result<String> {
        if self.public_base_url.is_empty() {
            return Err(ClimateError::Configuration(format!(
                "bucket {} has no public base URL",
                self.name
            )));
        }
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.public_base_url, self.name, name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket() -> Bucket {
        Bucket::new(
            Database::in_memory().unwrap(),
            DEFAULT_BUCKET,
            "http://127.0.0.1:54321/",
        )
    }

    #[test]
    fn test_public_url_shape() {
        let bucket = bucket();
        let url = bucket.public_url("climate-image-1.png").unwrap();
        assert_eq!(
            url,
            "http://127.0.0.1:54321/storage/v1/object/public/generated-images/climate-image-1.png"
        );
        assert_eq!(bucket.object_name_from_url(&url), Some("climate-image-1.png"));
        assert_eq!(bucket.object_name_from_url("http://elsewhere/x.png"), None);
    }

    #[test]
    fn test_round_trip_through_public_url() {
        let bucket = bucket();
        let bytes = b"\x89PNG\r\n\x1a\nrest-of-image".to_vec();

        let stored = bucket.put_object("a.png", &bytes, "image/png").unwrap();
        let url = bucket.public_url(&stored.name).unwrap();
        let name = bucket.object_name_from_url(&url).unwrap();

        let fetched = bucket.db.get_object(DEFAULT_BUCKET, name).unwrap().unwrap();
        assert_eq!(fetched.bytes, bytes);
        assert_eq!(stored.checksum, fetched.sha256);
    }

    #[test]
    fn test_blank_base_url_has_no_public_url() {
        let bucket = Bucket::new(Database::in_memory().unwrap(), DEFAULT_BUCKET, "  /");
        let err = bucket.public_url("a.png").unwrap_err();
        assert!(matches!(err, ClimateError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_name_is_storage_error() {
        let bucket = bucket();
        bucket.put_object("a.png", b"1", "image/png").unwrap();
        let err = bucket.put_object("a.png", b"2", "image/png").unwrap_err();
        assert!(matches!(err, ClimateError::Storage(_)));
    }
}

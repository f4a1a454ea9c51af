mod mock;
mod s3;

pub use mock::MockStore;
pub use s3::S3Store;

use crate::error::UploadError;

/// A single already-uploaded part, used to complete a multipart upload.
#[derive(Debug, Clone)]
pub struct CompletedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Summary of an object returned by `list_objects`.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size_bytes: u64,
}

/// Narrow transport contract a backend must implement. Every method maps to
/// one remote call; retry/backoff is the caller's responsibility, not the
/// store's.
pub trait ObjectStore: Send + Sync {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), UploadError>;

    fn head_bucket(&self, bucket: &str) -> Result<bool, UploadError>;

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, UploadError>;

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, UploadError>;

    fn create_multipart(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, UploadError>;

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, UploadError>;

    fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<(), UploadError>;

    fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), UploadError>;
}

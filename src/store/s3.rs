use std::sync::OnceLock;

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as AwsCompletedPart};

use crate::error::UploadError;

use super::{CompletedPart, ObjectStore, ObjectSummary};

fn tokio_runtime() -> &'static tokio::runtime::Runtime {
    static RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
    RT.get_or_init(|| {
        tokio::runtime::Runtime::new().expect("failed to start background tokio runtime")
    })
}

/// `ObjectStore` backed by `aws-sdk-s3`. The core worker pool is
/// thread-based, not async; every call here blocks its calling thread on a
/// shared background runtime rather than requiring the whole crate to be
/// async.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS config chain (environment,
    /// profile, instance metadata).
    pub fn from_env() -> Self {
        let config = tokio_runtime().block_on(aws_config::load_from_env());
        Self { client: Client::new(&config) }
    }
}

impl ObjectStore for S3Store {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), UploadError> {
        tokio_runtime().block_on(async {
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body))
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            Ok(())
        })
    }

    fn head_bucket(&self, bucket: &str) -> Result<bool, UploadError> {
        tokio_runtime().block_on(async {
            match self.client.head_bucket().bucket(bucket).send().await {
                Ok(_) => Ok(true),
                Err(e) if is_not_found(&e) => Ok(false),
                Err(e) => Err(UploadError::Transport(e.to_string())),
            }
        })
    }

    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<u64>, UploadError> {
        tokio_runtime().block_on(async {
            match self.client.head_object().bucket(bucket).key(key).send().await {
                Ok(resp) => Ok(Some(resp.content_length().unwrap_or_default().max(0) as u64)),
                Err(e) if is_not_found(&e) => Ok(None),
                Err(e) => Err(UploadError::Transport(e.to_string())),
            }
        })
    }

    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, UploadError> {
        tokio_runtime().block_on(async {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .send()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            Ok(resp
                .contents()
                .iter()
                .map(|o| ObjectSummary {
                    key: o.key().unwrap_or_default().to_string(),
                    size_bytes: o.size().unwrap_or_default().max(0) as u64,
                })
                .collect())
        })
    }

    fn create_multipart(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<String, UploadError> {
        tokio_runtime().block_on(async {
            let resp = self
                .client
                .create_multipart_upload()
                .bucket(bucket)
                .key(key)
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            resp.upload_id()
                .map(|s| s.to_string())
                .ok_or_else(|| UploadError::MultipartProtocol("create_multipart_upload returned no upload id".into()))
        })
    }

    fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, UploadError> {
        tokio_runtime().block_on(async {
            let resp = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(body))
                .send()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            resp.e_tag()
                .map(|s| s.to_string())
                .ok_or_else(|| UploadError::MultipartProtocol(format!("upload_part {part_number} returned no etag")))
        })
    }

    fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<(), UploadError> {
        tokio_runtime().block_on(async {
            let completed_parts: Vec<AwsCompletedPart> = parts
                .into_iter()
                .map(|p| {
                    AwsCompletedPart::builder()
                        .part_number(p.part_number)
                        .e_tag(p.etag)
                        .build()
                })
                .collect();
            self.client
                .complete_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder().set_parts(Some(completed_parts)).build(),
                )
                .send()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            Ok(())
        })
    }

    fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), UploadError> {
        tokio_runtime().block_on(async {
            self.client
                .abort_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .send()
                .await
                .map_err(|e| UploadError::Transport(e.to_string()))?;
            Ok(())
        })
    }
}

fn is_not_found<E: std::fmt::Debug, R: std::fmt::Debug>(err: &aws_sdk_s3::error::SdkError<E, R>) -> bool {
    let msg = format!("{err:?}");
    msg.contains("NotFound") || msg.contains("404")
}

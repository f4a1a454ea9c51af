use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A file discovered on local disk, with the relative path it will be
/// uploaded under.
#[derive(Debug, Clone)]
pub struct FileRef {
    /// Absolute (or CWD-relative) path on local disk.
    pub local_path: PathBuf,
    /// Path relative to the scan root, always using `/` separators.
    pub relative_path: String,
    pub size_bytes: u64,
}

/// A single unit of work handed to a worker: upload one file to one key.
#[derive(Debug, Clone)]
pub struct Job {
    pub file: FileRef,
    pub bucket: String,
    pub key: String,
}

/// Outcome of uploading a single file.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub source_path: PathBuf,
    pub size_bytes: u64,
    pub succeeded: bool,
    pub attempts: u32,
    pub used_multipart: bool,
    pub error: Option<String>,
    /// `Some(reason)` when the file was never actually sent to the store
    /// (dry-run and similar). A skipped result is always `succeeded`, but
    /// must not count toward transferred-bytes totals.
    pub skipped_reason: Option<String>,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl UploadResult {
    #[allow(clippy::too_many_arguments)]
    pub fn success(
        bucket: String,
        key: String,
        source_path: PathBuf,
        size_bytes: u64,
        attempts: u32,
        used_multipart: bool,
        elapsed: Duration,
    ) -> Self {
        Self {
            bucket,
            key,
            source_path,
            size_bytes,
            succeeded: true,
            attempts,
            used_multipart,
            error: None,
            skipped_reason: None,
            elapsed,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn failure(
        bucket: String,
        key: String,
        source_path: PathBuf,
        size_bytes: u64,
        attempts: u32,
        error: String,
        elapsed: Duration,
    ) -> Self {
        Self {
            bucket,
            key,
            source_path,
            size_bytes,
            succeeded: false,
            attempts,
            used_multipart: false,
            error: Some(error),
            skipped_reason: None,
            elapsed,
        }
    }

    /// A file that was deliberately never uploaded (dry-run). Counts as
    /// succeeded but contributes no bytes to progress/report totals.
    pub fn skipped(bucket: String, key: String, source_path: PathBuf, size_bytes: u64, reason: String, elapsed: Duration) -> Self {
        Self {
            bucket,
            key,
            source_path,
            size_bytes,
            succeeded: true,
            attempts: 0,
            used_multipart: false,
            error: None,
            skipped_reason: Some(reason),
            elapsed,
        }
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }
}

/// In-flight or completed state of a multipart upload.
#[derive(Debug, Clone)]
pub struct MultipartSession {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub part_size: u64,
    pub total_size: u64,
    pub completed_parts: Vec<CompletedPartInfo>,
}

#[derive(Debug, Clone)]
pub struct CompletedPartInfo {
    pub part_number: i32,
    pub etag: String,
}

impl MultipartSession {
    pub fn part_count(&self) -> u64 {
        self.total_size.div_ceil(self.part_size)
    }
}

/// One declared task in a task file: "upload this source into this bucket/prefix".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub source: PathBuf,
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Only meaningful when `source` is a directory: recurse into
    /// subdirectories, or upload only the immediate children.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
    /// Only meaningful when `source` is a single file: the destination key
    /// to use instead of the file's base name.
    #[serde(default)]
    pub s3_key: Option<String>,
    #[serde(default)]
    pub options: UploadOptions,
}

fn default_enabled() -> bool {
    true
}

fn default_recursive() -> bool {
    true
}

/// Result of running a single `TaskSpec`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_name: String,
    pub files_total: usize,
    pub files_succeeded: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub bytes_uploaded: u64,
    pub fatal_error: Option<String>,
    pub results: Vec<UploadResult>,
}

/// Aggregate report across every task in a run.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RunReport {
    pub tasks: Vec<TaskResult>,
    /// Tasks skipped outright because `enabled = false`.
    pub tasks_skipped: usize,
    /// True when every task that actually ran had `options.dry_run` set.
    pub dry_run: bool,
    pub started_at_epoch_ms: u64,
    pub finished_at_epoch_ms: u64,
}

impl RunReport {
    pub fn total_files(&self) -> usize {
        self.tasks.iter().map(|t| t.files_total).sum()
    }

    pub fn total_succeeded(&self) -> usize {
        self.tasks.iter().map(|t| t.files_succeeded).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.tasks.iter().map(|t| t.files_failed).sum()
    }

    pub fn total_files_skipped(&self) -> usize {
        self.tasks.iter().map(|t| t.files_skipped).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.tasks.iter().map(|t| t.bytes_uploaded).sum()
    }

    pub fn all_succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.fatal_error.is_none() && t.files_failed == 0)
    }
}

/// Tunables for a single upload or directory-upload run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOptions {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_parallel_uploads")]
    pub parallel_uploads: usize,
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: u64,
    #[serde(default = "default_multipart_chunksize")]
    pub multipart_chunksize: u64,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_max_retries() -> u32 {
    3
}
fn default_parallel_uploads() -> usize {
    4
}
fn default_multipart_threshold() -> u64 {
    64 * 1024 * 1024
}
fn default_multipart_chunksize() -> u64 {
    8 * 1024 * 1024
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            parallel_uploads: default_parallel_uploads(),
            multipart_threshold: default_multipart_threshold(),
            multipart_chunksize: default_multipart_chunksize(),
            exclude_patterns: Vec::new(),
            dry_run: false,
        }
    }
}

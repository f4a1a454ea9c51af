use std::time::Instant;

use crate::cancellation::CancellationToken;
use crate::content_type::guess_content_type;
use crate::error::UploadError;
use crate::model::{Job, UploadOptions, UploadResult};
use crate::multipart::MultipartEngine;
use crate::progress::ProgressTracker;
use crate::retry::{RetryPhase, retry_with_backoff};
use crate::store::ObjectStore;

/// Uploads a single file, choosing between a plain `put_object` and the
/// multipart engine based on `UploadOptions::multipart_threshold`.
pub struct SingleUploader<'a> {
    pub store: &'a dyn ObjectStore,
    pub options: &'a UploadOptions,
    pub progress: Option<&'a ProgressTracker>,
}

impl<'a> SingleUploader<'a> {
    pub fn new(store: &'a dyn ObjectStore, options: &'a UploadOptions, progress: Option<&'a ProgressTracker>) -> Self {
        Self { store, options, progress }
    }

    pub fn upload(&self, job: Job, cancel: &CancellationToken) -> UploadResult {
        let started = Instant::now();
        let size = job.file.size_bytes;

        if self.options.dry_run {
            if let Some(p) = self.progress {
                p.file_completed();
            }
            return UploadResult::skipped(
                job.bucket,
                job.key,
                job.file.local_path,
                size,
                "dry_run".to_string(),
                started.elapsed(),
            );
        }

        let use_multipart = size >= self.options.multipart_threshold;
        let result = if use_multipart {
            self.upload_multipart(&job, cancel)
        } else {
            self.upload_standard(&job, cancel)
        };

        if let Some(p) = self.progress {
            p.file_completed();
        }

        match result {
            Ok(attempts) => {
                UploadResult::success(job.bucket, job.key, job.file.local_path, size, attempts, use_multipart, started.elapsed())
            }
            Err((e, attempts)) => {
                UploadResult::failure(job.bucket, job.key, job.file.local_path, size, attempts, e.to_string(), started.elapsed())
            }
        }
    }

    fn upload_standard(&self, job: &Job, cancel: &CancellationToken) -> Result<u32, (UploadError, u32)> {
        let content_type = guess_content_type(&job.key);
        let is_cancelled = || cancel.is_cancelled();
        let (res, attempts) =
            retry_with_backoff(self.options.max_retries, RetryPhase::DuringTransfer, &is_cancelled, || {
                let bytes = std::fs::read(&job.file.local_path).map_err(UploadError::from)?;
                self.store.put_object(&job.bucket, &job.key, bytes, content_type)
            });
        match res {
            Ok(()) => {
                if let Some(p) = self.progress {
                    p.add_bytes(job.file.size_bytes);
                }
                Ok(attempts)
            }
            Err(e) => Err((e, attempts)),
        }
    }

    /// Retries the entire multipart cycle on failure — a fresh
    /// `create_multipart`, fresh parts, fresh complete/abort — rather than
    /// retrying individual parts in place. The engine itself makes exactly
    /// one attempt per call.
    fn upload_multipart(&self, job: &Job, cancel: &CancellationToken) -> Result<u32, (UploadError, u32)> {
        let engine = MultipartEngine::new(self.store, self.progress);
        let part_size = self.options.multipart_chunksize.max(1);
        let parallelism = self.options.parallel_uploads.max(1);
        let is_cancelled = || cancel.is_cancelled();
        let (result, attempts) =
            retry_with_backoff(self.options.max_retries, RetryPhase::DuringTransfer, &is_cancelled, || {
                if parallelism > 1 {
                    engine.upload_parallel(
                        &job.bucket,
                        &job.key,
                        &job.file.local_path,
                        job.file.size_bytes,
                        part_size,
                        parallelism,
                        cancel,
                    )
                } else {
                    engine.upload_sequential(&job.bucket, &job.key, &job.file.local_path, job.file.size_bytes, part_size, cancel)
                }
            });
        result.map(|()| attempts).map_err(|e| (e, attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FileRef;
    use crate::store::MockStore;
    use std::io::Write;
    use std::path::PathBuf;

    fn job_for(path: PathBuf, key: &str, size: u64) -> Job {
        Job {
            file: FileRef { local_path: path, relative_path: key.to_string(), size_bytes: size },
            bucket: "bkt".to_string(),
            key: key.to_string(),
        }
    }

    #[test]
    fn small_file_uses_standard_upload() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello world").unwrap();
        f.flush().unwrap();
        let store = MockStore::new();
        let options = UploadOptions::default();
        let uploader = SingleUploader::new(&store, &options, None);
        let job = job_for(f.path().to_path_buf(), "hello.txt", 11);
        let cancel = CancellationToken::new();
        let result = uploader.upload(job, &cancel);
        assert!(result.succeeded);
        assert!(!result.used_multipart);
        assert_eq!(store.stored_object("bkt", "hello.txt").unwrap(), b"hello world");
    }

    #[test]
    fn large_file_uses_multipart() {
        let data = vec![3u8; 70 * 1024 * 1024];
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&data).unwrap();
        f.flush().unwrap();
        let store = MockStore::new();
        let options = UploadOptions::default();
        let uploader = SingleUploader::new(&store, &options, None);
        let job = job_for(f.path().to_path_buf(), "big.bin", data.len() as u64);
        let cancel = CancellationToken::new();
        let result = uploader.upload(job, &cancel);
        assert!(result.succeeded);
        assert!(result.used_multipart);
        assert_eq!(store.stored_object("bkt", "big.bin").unwrap().len(), data.len());
    }

    #[test]
    fn dry_run_never_calls_store() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"data").unwrap();
        f.flush().unwrap();
        let store = MockStore::new();
        let mut options = UploadOptions::default();
        options.dry_run = true;
        let uploader = SingleUploader::new(&store, &options, None);
        let job = job_for(f.path().to_path_buf(), "k.txt", 4);
        let cancel = CancellationToken::new();
        let result = uploader.upload(job, &cancel);
        assert!(result.succeeded);
        assert!(result.skipped_reason.is_some());
        assert!(store.calls().is_empty());
    }

    #[test]
    fn dry_run_does_not_advance_progress_bytes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"data").unwrap();
        f.flush().unwrap();
        let store = MockStore::new();
        let mut options = UploadOptions::default();
        options.dry_run = true;
        let progress = crate::progress::ProgressTracker::new(1, 4);
        let uploader = SingleUploader::new(&store, &options, Some(&progress));
        let job = job_for(f.path().to_path_buf(), "k.txt", 4);
        let cancel = CancellationToken::new();
        let result = uploader.upload(job, &cancel);
        assert!(result.succeeded);
        assert_eq!(progress.snapshot().bytes_done, 0);
        assert_eq!(progress.snapshot().files_done, 1);
    }

    #[test]
    fn multipart_failure_retries_the_whole_cycle_and_succeeds() {
        crate::retry::set_backoff_base_ms(1);
        let data = vec![5u8; 70 * 1024 * 1024];
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&data).unwrap();
        f.flush().unwrap();
        let store = MockStore::new();
        store.fail_part("big.bin", 2, 1);
        let mut options = UploadOptions::default();
        options.max_retries = 2;
        options.parallel_uploads = 1;
        let uploader = SingleUploader::new(&store, &options, None);
        let job = job_for(f.path().to_path_buf(), "big.bin", data.len() as u64);
        let cancel = CancellationToken::new();
        let result = uploader.upload(job, &cancel);
        assert!(result.succeeded);
        let create_calls = store.calls().iter().filter(|c| c.starts_with("create_multipart")).count();
        assert_eq!(create_calls, 2, "a failed cycle should restart with a fresh multipart session");
    }

    #[test]
    fn transport_failure_is_reported_on_result() {
        crate::retry::set_backoff_base_ms(1);
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"data").unwrap();
        f.flush().unwrap();
        let store = MockStore::new();
        store.fail_put("k.txt", 100);
        let mut options = UploadOptions::default();
        options.max_retries = 1;
        let uploader = SingleUploader::new(&store, &options, None);
        let job = job_for(f.path().to_path_buf(), "k.txt", 4);
        let cancel = CancellationToken::new();
        let result = uploader.upload(job, &cancel);
        assert!(!result.succeeded);
        assert!(result.error.is_some());
    }
}

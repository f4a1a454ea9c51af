use std::fs::File;
use std::os::unix::fs::FileExt;
use std::sync::Arc;

use crossbeam_channel::bounded;

use crate::cancellation::CancellationToken;
use crate::content_type::guess_content_type;
use crate::error::UploadError;
use crate::model::{CompletedPartInfo, MultipartSession};
use crate::progress::ProgressTracker;
use crate::store::{CompletedPart, ObjectStore};

/// Drives a multipart upload for one file through init -> upload parts ->
/// complete, aborting on any unrecoverable part failure. The engine issues
/// each init/part/complete call exactly once; retrying a failed cycle from
/// scratch (a fresh `create_multipart`) is the caller's responsibility — see
/// `single.rs::upload_multipart`.
pub struct MultipartEngine<'a> {
    pub store: &'a dyn ObjectStore,
    pub progress: Option<&'a ProgressTracker>,
}

struct PlannedPart {
    part_number: i32,
    offset: u64,
    len: u64,
}

fn plan_parts(total_size: u64, part_size: u64) -> Vec<PlannedPart> {
    let mut parts = Vec::new();
    let mut offset = 0u64;
    let mut part_number = 1i32;
    while offset < total_size {
        let len = part_size.min(total_size - offset);
        parts.push(PlannedPart { part_number, offset, len });
        offset += len;
        part_number += 1;
    }
    if parts.is_empty() {
        parts.push(PlannedPart { part_number: 1, offset: 0, len: 0 });
    }
    parts
}

impl<'a> MultipartEngine<'a> {
    pub fn new(store: &'a dyn ObjectStore, progress: Option<&'a ProgressTracker>) -> Self {
        Self { store, progress }
    }

    /// Upload `local_path` as `bucket/key` in `part_size`-byte chunks, one
    /// part at a time on the calling thread.
    pub fn upload_sequential(
        &self,
        bucket: &str,
        key: &str,
        local_path: &std::path::Path,
        total_size: u64,
        part_size: u64,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let file = File::open(local_path)?;
        let content_type = guess_content_type(key);
        let upload_id = self.init(bucket, key, &content_type, cancel)?;
        let parts = plan_parts(total_size, part_size);
        let mut completed = Vec::with_capacity(parts.len());

        for part in &parts {
            if cancel.is_cancelled() {
                self.abort(bucket, key, &upload_id);
                return Err(UploadError::Cancelled);
            }
            let mut buf = vec![0u8; part.len as usize];
            file.read_exact_at(&mut buf, part.offset)?;
            match self.upload_one_part(bucket, key, &upload_id, part.part_number, buf, cancel) {
                Ok(etag) => {
                    if let Some(p) = self.progress {
                        p.add_bytes(part.len);
                    }
                    completed.push(CompletedPart { part_number: part.part_number, etag });
                }
                Err(e) => {
                    self.abort(bucket, key, &upload_id);
                    return Err(e);
                }
            }
        }

        self.store
            .complete_multipart(bucket, key, &upload_id, completed)
            .map_err(|e| {
                self.abort(bucket, key, &upload_id);
                e
            })
    }

    /// Upload `local_path` using up to `parallelism` worker threads, each
    /// reading its assigned parts with `read_at` so no shared file cursor
    /// is needed.
    pub fn upload_parallel(
        &self,
        bucket: &str,
        key: &str,
        local_path: &std::path::Path,
        total_size: u64,
        part_size: u64,
        parallelism: usize,
        cancel: &CancellationToken,
    ) -> Result<(), UploadError> {
        let content_type = guess_content_type(key);
        let upload_id = self.init(bucket, key, &content_type, cancel)?;
        let parts = plan_parts(total_size, part_size);
        let workers = parallelism.max(1).min(parts.len().max(1));

        let (job_tx, job_rx) = bounded::<PlannedPart>(parts.len());
        let (result_tx, result_rx) = bounded::<Result<CompletedPartInfo, UploadError>>(parts.len());
        for part in parts {
            job_tx.send(part).expect("job channel send");
        }
        drop(job_tx);

        let file = Arc::new(File::open(local_path)?);
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let file = Arc::clone(&file);
                let upload_id = upload_id.clone();
                scope.spawn(move || {
                    while let Ok(part) = job_rx.recv() {
                        if cancel.is_cancelled() {
                            let _ = result_tx.send(Err(UploadError::Cancelled));
                            continue;
                        }
                        let mut buf = vec![0u8; part.len as usize];
                        let outcome = file
                            .read_exact_at(&mut buf, part.offset)
                            .map_err(UploadError::from)
                            .and_then(|_| {
                                self.upload_one_part(bucket, key, &upload_id, part.part_number, buf, cancel)
                            });
                        match outcome {
                            Ok(etag) => {
                                if let Some(p) = self.progress {
                                    p.add_bytes(part.len);
                                }
                                let _ = result_tx
                                    .send(Ok(CompletedPartInfo { part_number: part.part_number, etag }));
                            }
                            Err(e) => {
                                let _ = result_tx.send(Err(e));
                            }
                        }
                    }
                });
            }
            drop(result_tx);

            let mut completed = Vec::new();
            let mut first_error: Option<UploadError> = None;
            for res in result_rx {
                match res {
                    Ok(part) => completed.push(part),
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }

            if let Some(e) = first_error {
                self.abort(bucket, key, &upload_id);
                return Err(e);
            }

            completed.sort_by_key(|p| p.part_number);
            let aws_parts: Vec<CompletedPart> = completed
                .into_iter()
                .map(|p| CompletedPart { part_number: p.part_number, etag: p.etag })
                .collect();
            self.store.complete_multipart(bucket, key, &upload_id, aws_parts).map_err(|e| {
                self.abort(bucket, key, &upload_id);
                e
            })
        })
    }

    fn init(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        self.store.create_multipart(bucket, key, content_type)
    }

    fn upload_one_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        self.store.upload_part(bucket, key, upload_id, part_number, body)
    }

    fn abort(&self, bucket: &str, key: &str, upload_id: &str) {
        let _ = self.store.abort_multipart(bucket, key, upload_id);
    }
}

/// Build a `MultipartSession` snapshot for a planned upload, useful for
/// logging/inspection before any network call is made.
pub fn plan_session(bucket: &str, key: &str, upload_id: &str, total_size: u64, part_size: u64) -> MultipartSession {
    MultipartSession {
        bucket: bucket.to_string(),
        key: key.to_string(),
        upload_id: upload_id.to_string(),
        part_size,
        total_size,
        completed_parts: Vec::new(),
    }
}

use std::path::Path;

use crate::cancellation::CancellationToken;
use crate::error::UploadError;
use crate::model::{FileRef, Job, UploadOptions, UploadResult};
use crate::pool::WorkerPool;
use crate::progress::ProgressTracker;
use crate::scanner::Scanner;
use crate::single::SingleUploader;
use crate::store::ObjectStore;

/// Below this many files, dispatch is sequential on the calling thread — the
/// overhead of spinning up a worker pool is not worth it for a handful of
/// files.
const SEQUENTIAL_THRESHOLD: usize = 1;

/// Scans a local directory and uploads every discovered file under
/// `bucket/prefix`, choosing sequential or pooled dispatch based on how many
/// files were found.
pub struct DirectoryUploader<'a> {
    pub store: &'a dyn ObjectStore,
    pub options: &'a UploadOptions,
}

impl<'a> DirectoryUploader<'a> {
    pub fn new(store: &'a dyn ObjectStore, options: &'a UploadOptions) -> Self {
        Self { store, options }
    }

    pub fn upload_directory(
        &self,
        root: &Path,
        bucket: &str,
        prefix: &str,
        recursive: bool,
        cancel: &CancellationToken,
    ) -> Result<(ProgressTracker, Vec<UploadResult>), UploadError> {
        let scanner = Scanner::new(self.options.exclude_patterns.clone());
        let files = scanner.scan(root, recursive)?;

        let bytes_total: u64 = files.iter().map(|f| f.size_bytes).sum();
        let progress = ProgressTracker::new(files.len() as u64, bytes_total);

        if files.is_empty() {
            return Ok((progress, Vec::new()));
        }

        let jobs: Vec<Job> = files.into_iter().map(|f| make_job(f, bucket, prefix)).collect();

        let results = if jobs.len() <= SEQUENTIAL_THRESHOLD {
            let uploader = SingleUploader::new(self.store, self.options, Some(&progress));
            jobs.into_iter().map(|job| uploader.upload(job, cancel)).collect()
        } else {
            let worker_count = self.options.parallel_uploads.min(jobs.len()).max(1);
            let pool = WorkerPool::new(worker_count);
            let options = self.options;
            let store = self.store;
            let progress_ref = &progress;
            pool.run(jobs, cancel, move |job| {
                let uploader = SingleUploader::new(store, options, Some(progress_ref));
                uploader.upload(job, cancel)
            })
        };

        Ok((progress, results))
    }
}

fn make_job(file: FileRef, bucket: &str, prefix: &str) -> Job {
    let key = join_key(prefix, &file.relative_path);
    Job { file, bucket: bucket.to_string(), key }
}

fn join_key(prefix: &str, relative_path: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        relative_path.to_string()
    } else {
        format!("{trimmed}/{relative_path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockStore;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let full = root.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, contents).unwrap();
    }

    #[test]
    fn empty_directory_produces_no_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::new();
        let options = UploadOptions::default();
        let uploader = DirectoryUploader::new(&store, &options);
        let cancel = CancellationToken::new();
        let (progress, results) = uploader.upload_directory(dir.path(), "bkt", "prefix", true, &cancel).unwrap();
        assert!(results.is_empty());
        assert_eq!(progress.snapshot().files_total, 0);
    }

    #[test]
    fn empty_prefix_uploads_at_bucket_root() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"x");
        let store = MockStore::new();
        let options = UploadOptions::default();
        let uploader = DirectoryUploader::new(&store, &options);
        let cancel = CancellationToken::new();
        let (_p, results) = uploader.upload_directory(dir.path(), "bkt", "", true, &cancel).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "a.txt");
    }

    #[test]
    fn nonempty_prefix_is_joined_with_slash() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "sub/a.txt", b"x");
        let store = MockStore::new();
        let options = UploadOptions::default();
        let uploader = DirectoryUploader::new(&store, &options);
        let cancel = CancellationToken::new();
        let (_p, results) = uploader.upload_directory(dir.path(), "bkt", "backup", true, &cancel).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "backup/sub/a.txt");
    }

    #[test]
    fn multiple_files_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..10 {
            write(dir.path(), &format!("f{i}.txt"), b"x");
        }
        let store = MockStore::new();
        let options = UploadOptions::default();
        let uploader = DirectoryUploader::new(&store, &options);
        let cancel = CancellationToken::new();
        let (_p, results) = uploader.upload_directory(dir.path(), "bkt", "", true, &cancel).unwrap();
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.succeeded));
    }

    #[test]
    fn non_recursive_skips_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "top.txt", b"x");
        write(dir.path(), "sub/nested.txt", b"y");
        let store = MockStore::new();
        let options = UploadOptions::default();
        let uploader = DirectoryUploader::new(&store, &options);
        let cancel = CancellationToken::new();
        let (_p, results) = uploader.upload_directory(dir.path(), "bkt", "", false, &cancel).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "top.txt");
    }

    #[test]
    fn exclusions_prune_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "keep.txt", b"x");
        write(dir.path(), "pkg/__pycache__/mod.pyc", b"y");
        let store = MockStore::new();
        let mut options = UploadOptions::default();
        options.exclude_patterns = vec!["__pycache__".to_string()];
        let uploader = DirectoryUploader::new(&store, &options);
        let cancel = CancellationToken::new();
        let (_p, results) = uploader.upload_directory(dir.path(), "bkt", "", true, &cancel).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "keep.txt");
    }
}

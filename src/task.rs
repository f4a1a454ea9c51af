use std::time::{SystemTime, UNIX_EPOCH};

use crate::cancellation::CancellationToken;
use crate::directory::DirectoryUploader;
use crate::error::UploadError;
use crate::model::{Job, RunReport, TaskResult, TaskSpec, UploadResult};
use crate::scanner::Scanner;
use crate::single::SingleUploader;
use crate::store::ObjectStore;

/// Runs an ordered list of `TaskSpec`s against a single `ObjectStore`,
/// aggregating each task's outcome into a `RunReport`. A single task's
/// fatal error (e.g. its source directory does not exist) does not stop
/// the remaining tasks from running.
pub struct TaskRunner<'a> {
    pub store: &'a dyn ObjectStore,
}

impl<'a> TaskRunner<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    pub fn run(&self, tasks: &[TaskSpec], cancel: &CancellationToken) -> RunReport {
        let mut report = RunReport { started_at_epoch_ms: now_epoch_ms(), ..Default::default() };
        let runnable: Vec<&TaskSpec> = tasks.iter().filter(|t| t.enabled).collect();
        report.dry_run = !runnable.is_empty() && runnable.iter().all(|t| t.options.dry_run);

        for task in tasks {
            if !task.enabled {
                report.tasks_skipped += 1;
                continue;
            }
            if cancel.is_cancelled() {
                report.tasks.push(fatal_result(task, "run cancelled before task started".to_string()));
                continue;
            }
            report.tasks.push(self.run_one(task, cancel));
        }
        report.finished_at_epoch_ms = now_epoch_ms();
        report
    }

    fn run_one(&self, task: &TaskSpec, cancel: &CancellationToken) -> TaskResult {
        let outcome = if task.source.is_dir() {
            let uploader = DirectoryUploader::new(self.store, &task.options);
            uploader
                .upload_directory(&task.source, &task.bucket, &task.prefix, task.recursive, cancel)
                .map(|(_progress, results)| results)
        } else {
            self.upload_single_file(task, cancel).map(|result| vec![result])
        };

        match outcome {
            Ok(results) => summarize(task, results),
            Err(e) => fatal_result(task, e.to_string()),
        }
    }

    /// A `TaskSpec` whose `source` is a single file, not a directory: stat
    /// it directly and hand it to `SingleUploader` rather than routing it
    /// through `DirectoryUploader`/`Scanner::scan`, which require a
    /// directory root.
    fn upload_single_file(&self, task: &TaskSpec, cancel: &CancellationToken) -> Result<UploadResult, UploadError> {
        let scanner = Scanner::new(Vec::new());
        let file = scanner.stat(&task.source)?;
        let key = task.s3_key.clone().unwrap_or_else(|| file.relative_path.clone());
        let job = Job { file, bucket: task.bucket.clone(), key };
        let uploader = SingleUploader::new(self.store, &task.options, None);
        Ok(uploader.upload(job, cancel))
    }
}

fn summarize(task: &TaskSpec, results: Vec<UploadResult>) -> TaskResult {
    let files_skipped = results.iter().filter(|r| r.skipped_reason.is_some()).count();
    let files_succeeded = results.iter().filter(|r| r.succeeded && r.skipped_reason.is_none()).count();
    let files_failed = results.iter().filter(|r| !r.succeeded).count();
    let bytes_uploaded =
        results.iter().filter(|r| r.succeeded && r.skipped_reason.is_none()).map(|r| r.size_bytes).sum();
    TaskResult {
        task_name: task.name.clone(),
        files_total: results.len(),
        files_succeeded,
        files_failed,
        files_skipped,
        bytes_uploaded,
        fatal_error: None,
        results,
    }
}

fn fatal_result(task: &TaskSpec, error: String) -> TaskResult {
    TaskResult {
        task_name: task.name.clone(),
        files_total: 0,
        files_succeeded: 0,
        files_failed: 0,
        files_skipped: 0,
        bytes_uploaded: 0,
        fatal_error: Some(error),
        results: Vec::new(),
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UploadOptions;
    use crate::store::MockStore;
    use std::fs;

    fn task_for(dir: &std::path::Path, name: &str) -> TaskSpec {
        TaskSpec {
            name: name.to_string(),
            source: dir.to_path_buf(),
            bucket: "bkt".to_string(),
            prefix: String::new(),
            enabled: true,
            recursive: true,
            s3_key: None,
            options: UploadOptions::default(),
        }
    }

    #[test]
    fn aggregates_multiple_tasks() {
        let dir1 = tempfile::tempdir().unwrap();
        fs::write(dir1.path().join("a.txt"), b"1").unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        fs::write(dir2.path().join("b.txt"), b"22").unwrap();

        let store = MockStore::new();
        let tasks = vec![task_for(dir1.path(), "t1"), task_for(dir2.path(), "t2")];
        let runner = TaskRunner::new(&store);
        let cancel = CancellationToken::new();
        let report = runner.run(&tasks, &cancel);

        assert_eq!(report.tasks.len(), 2);
        assert_eq!(report.total_files(), 2);
        assert_eq!(report.total_succeeded(), 2);
        assert!(report.all_succeeded());
        assert!(report.finished_at_epoch_ms >= report.started_at_epoch_ms);
    }

    #[test]
    fn disabled_task_is_counted_but_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let store = MockStore::new();
        let mut task = task_for(dir.path(), "skip-me");
        task.enabled = false;
        let runner = TaskRunner::new(&store);
        let cancel = CancellationToken::new();
        let report = runner.run(&[task], &cancel);
        assert!(report.tasks.is_empty());
        assert_eq!(report.tasks_skipped, 1);
    }

    #[test]
    fn missing_source_is_a_fatal_task_error_not_a_panic() {
        let store = MockStore::new();
        let task = task_for(std::path::Path::new("/no/such/dir"), "broken");
        let runner = TaskRunner::new(&store);
        let cancel = CancellationToken::new();
        let report = runner.run(&[task], &cancel);
        assert_eq!(report.tasks.len(), 1);
        assert!(report.tasks[0].fatal_error.is_some());
        assert!(!report.all_succeeded());
    }

    #[test]
    fn single_file_source_uploads_via_single_uploader() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("report.csv");
        fs::write(&file_path, b"a,b,c").unwrap();

        let store = MockStore::new();
        let mut task = task_for(&file_path, "single");
        task.recursive = true;
        let runner = TaskRunner::new(&store);
        let cancel = CancellationToken::new();
        let report = runner.run(&[task], &cancel);

        assert_eq!(report.tasks.len(), 1);
        assert!(report.tasks[0].fatal_error.is_none());
        assert_eq!(report.tasks[0].files_total, 1);
        assert_eq!(report.tasks[0].results[0].key, "report.csv");
        assert_eq!(store.stored_object("bkt", "report.csv").unwrap(), b"a,b,c");
    }

    #[test]
    fn single_file_source_honors_explicit_s3_key() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("report.csv");
        fs::write(&file_path, b"a,b,c").unwrap();

        let store = MockStore::new();
        let mut task = task_for(&file_path, "single");
        task.s3_key = Some("archive/2026/report.csv".to_string());
        let runner = TaskRunner::new(&store);
        let cancel = CancellationToken::new();
        let report = runner.run(&[task], &cancel);

        assert_eq!(report.tasks[0].results[0].key, "archive/2026/report.csv");
    }

    #[test]
    fn dry_run_flag_reflects_all_executed_tasks() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"1").unwrap();
        let store = MockStore::new();
        let mut task = task_for(dir.path(), "t1");
        task.options.dry_run = true;
        let runner = TaskRunner::new(&store);
        let cancel = CancellationToken::new();
        let report = runner.run(&[task], &cancel);
        assert!(report.dry_run);
        assert_eq!(report.tasks[0].files_skipped, 1);
    }
}

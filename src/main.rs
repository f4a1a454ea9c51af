use std::fs::OpenOptions;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use bulkship::cancellation::CancellationToken;
use bulkship::cli::{Cli, Commands};
use bulkship::config::{self, AppConfig};
use bulkship::directory::DirectoryUploader;
use bulkship::model::{RunReport, TaskResult, TaskSpec, UploadOptions};
use bulkship::single::SingleUploader;
use bulkship::store::S3Store;
use bulkship::task::TaskRunner;
use bulkship::util;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_if_requested(cli.debug);

    match cli.command {
        Commands::Upload {
            source,
            bucket,
            prefix,
            s3_key,
            non_recursive,
            concurrency,
            max_retries,
            multipart_threshold_mib,
            multipart_chunksize_mib,
            exclude,
            dry_run,
            json,
            quiet,
        } => {
            let options = UploadOptions {
                max_retries,
                parallel_uploads: concurrency.unwrap_or_else(|| {
                    bulkship::auto_concurrency::choose_auto_concurrency(1, 0)
                }),
                multipart_threshold: multipart_threshold_mib * 1024 * 1024,
                multipart_chunksize: multipart_chunksize_mib * 1024 * 1024,
                exclude_patterns: exclude,
                dry_run,
            };
            run_upload(&source, &bucket, &prefix, s3_key.as_deref(), !non_recursive, options, json, quiet)
        }
        Commands::Run { tasks, json, quiet } => run_task_file(&tasks, json, quiet),
        Commands::InitConfig {} => {
            let config = AppConfig::default();
            config.save_to_storage().context("failed to write default config")?;
            println!("wrote default configuration to {}", config::config_dir()?.join("config.json").display());
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_upload(
    source: &Path,
    bucket: &str,
    prefix: &str,
    s3_key: Option<&str>,
    recursive: bool,
    options: UploadOptions,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let store = S3Store::from_env();
    let cancel = CancellationToken::new();
    let started = Instant::now();
    let started_at_epoch_ms = now_epoch_ms();

    let task_result = if source.is_dir() {
        let uploader = DirectoryUploader::new(&store, &options);
        match uploader.upload_directory(source, bucket, prefix, recursive, &cancel) {
            Ok((_progress, results)) => summarize("upload", results),
            Err(e) => TaskResult {
                task_name: "upload".to_string(),
                files_total: 0,
                files_succeeded: 0,
                files_failed: 0,
                files_skipped: 0,
                bytes_uploaded: 0,
                fatal_error: Some(e.to_string()),
                results: Vec::new(),
            },
        }
    } else {
        let scanner = bulkship::scanner::Scanner::new(Vec::new());
        let file = scanner.stat(source)?;
        let key = match s3_key {
            Some(k) => k.to_string(),
            None => {
                let trimmed = prefix.trim_matches('/');
                if trimmed.is_empty() { file.relative_path.clone() } else { format!("{trimmed}/{}", file.relative_path) }
            }
        };
        let job = bulkship::model::Job { file, bucket: bucket.to_string(), key };
        let uploader = SingleUploader::new(&store, &options, None);
        let result = uploader.upload(job, &cancel);
        summarize("upload", vec![result])
    };

    let report = RunReport {
        tasks: vec![task_result],
        dry_run: options.dry_run,
        started_at_epoch_ms,
        finished_at_epoch_ms: now_epoch_ms(),
        ..Default::default()
    };
    render_report(&report, started.elapsed().as_secs_f64(), json, quiet);
    if !report.all_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn run_task_file(path: &Path, json: bool, quiet: bool) -> Result<()> {
    let data = std::fs::read_to_string(path).with_context(|| format!("reading task file {}", path.display()))?;
    let tasks: Vec<TaskSpec> = serde_json::from_str(&data).context("parsing task file as JSON")?;
    let store = S3Store::from_env();
    let cancel = CancellationToken::new();
    let started = Instant::now();

    let runner = TaskRunner::new(&store);
    let report = runner.run(&tasks, &cancel);
    render_report(&report, started.elapsed().as_secs_f64(), json, quiet);
    if !report.all_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn summarize(name: &str, results: Vec<bulkship::model::UploadResult>) -> TaskResult {
    let files_skipped = results.iter().filter(|r| r.skipped_reason.is_some()).count();
    let files_succeeded = results.iter().filter(|r| r.succeeded && r.skipped_reason.is_none()).count();
    let files_failed = results.iter().filter(|r| !r.succeeded).count();
    let bytes_uploaded =
        results.iter().filter(|r| r.succeeded && r.skipped_reason.is_none()).map(|r| r.size_bytes).sum();
    TaskResult {
        task_name: name.to_string(),
        files_total: results.len(),
        files_succeeded,
        files_failed,
        files_skipped,
        bytes_uploaded,
        fatal_error: None,
        results,
    }
}

fn render_report(report: &RunReport, elapsed_secs: f64, json: bool, quiet: bool) {
    if json {
        if let Ok(s) = serde_json::to_string(report) {
            println!("{}", s);
        }
        return;
    }
    if !quiet {
        util::print_summary(report, elapsed_secs);
        for task in &report.tasks {
            if let Some(err) = &task.fatal_error {
                eprintln!("task '{}' failed: {}", task.task_name, err);
            }
        }
    }
    let failures_path = config::logs_dir().ok().map(|d| d.join("failures.jsonl"));
    util::write_failures_jsonl(failures_path, report);
}

fn init_tracing_if_requested(debug: bool) {
    let logs_dir = match config::logs_dir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let _ = std::fs::create_dir_all(&logs_dir);
    let log_path = logs_dir.join("debug.log");
    let level_str = if debug { "debug" } else { "warn" };

    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            let (non_blocking_writer, guard) = non_blocking(file);
            let _ = Box::leak(Box::new(guard));
            let file_layer = fmt::layer()
                .with_writer(non_blocking_writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new(level_str));
            tracing_subscriber::registry().with(file_layer).init();
        }
        Err(e) => {
            eprintln!("warning: could not open debug log at {}: {}", log_path.display(), e);
        }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::UploadError;
use crate::model::RunReport;

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Build a `MultiProgress` plus a total-progress bar sized to `total` bytes.
pub fn init_progress(quiet: bool, total: u64) -> (Arc<MultiProgress>, ProgressBar) {
    let mp = Arc::new(if quiet { MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden()) } else { MultiProgress::new() });
    let style = ProgressStyle::with_template(
        "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=>-");
    let total_pb = mp.add(ProgressBar::new(total));
    total_pb.set_style(style);
    (mp, total_pb)
}

/// Print a one-line human-readable summary for a completed run.
pub fn print_summary(report: &RunReport, elapsed_secs: f64) {
    let total_bytes = report.total_bytes();
    let rate = if elapsed_secs > 0.0 { human_bytes((total_bytes as f64 / elapsed_secs) as u64) } else { human_bytes(0) };
    let skipped = report.total_files_skipped();
    let skip_suffix = if skipped > 0 { format!(", {} skipped", skipped) } else { String::new() };
    let tasks_skipped_suffix =
        if report.tasks_skipped > 0 { format!(", {} tasks disabled", report.tasks_skipped) } else { String::new() };
    println!(
        "uploaded {} files ({} failed{}){}, {} in {:.2}s ({}/s)",
        report.total_succeeded(),
        report.total_failed(),
        skip_suffix,
        tasks_skipped_suffix,
        human_bytes(total_bytes),
        elapsed_secs,
        rate
    );
}

/// Write every failed `UploadResult` across the report as JSON Lines.
pub fn write_failures_jsonl(path: Option<PathBuf>, report: &RunReport) {
    let Some(path) = path else { return };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&path) else { return };
    for task in &report.tasks {
        if let Some(err) = &task.fatal_error {
            let obj = serde_json::json!({"task": task.task_name, "fatal": true, "error": err});
            if let Ok(line) = serde_json::to_string(&obj) {
                let _ = writeln!(f, "{}", line);
            }
        }
        for result in task.results.iter().filter(|r| !r.succeeded) {
            let obj = serde_json::json!({
                "task": task.task_name,
                "key": result.key,
                "attempts": result.attempts,
                "error": result.error,
            });
            if let Ok(line) = serde_json::to_string(&obj) {
                let _ = writeln!(f, "{}", line);
            }
        }
    }
}

/// Serialize a single `UploadError` into the same structured shape used by
/// `write_failures_jsonl`, for callers that want to log one failure at a
/// time instead of through a `RunReport`.
pub fn describe_error(err: &UploadError) -> serde_json::Value {
    use UploadError::*;
    match err {
        InvalidInput(s) => serde_json::json!({"variant": "InvalidInput", "message": s}),
        Transport(s) => serde_json::json!({"variant": "Transport", "message": s}),
        MultipartProtocol(s) => serde_json::json!({"variant": "MultipartProtocol", "message": s}),
        Cancelled => serde_json::json!({"variant": "Cancelled"}),
        Internal(s) => serde_json::json!({"variant": "Internal", "message": s}),
    }
}

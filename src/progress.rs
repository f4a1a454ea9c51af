use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// What a single worker is doing right now, for display purposes.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub worker_id: usize,
    pub current_key: Option<String>,
    pub bytes_done: u64,
}

/// Point-in-time snapshot of an upload run's progress.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub files_total: u64,
    pub files_done: u64,
    pub bytes_total: u64,
    pub bytes_done: u64,
    pub bytes_per_sec: f64,
    pub eta_secs: Option<f64>,
    pub workers: Vec<WorkerStatus>,
}

/// Shared, thread-safe progress state for a single run. Cheap to clone
/// (internally `Arc`-free; callers wrap it in `Arc` themselves when sharing
/// across worker threads) — counters are atomics, only the per-worker
/// status map needs a mutex.
pub struct ProgressTracker {
    started_at: Instant,
    files_total: AtomicU64,
    files_done: AtomicU64,
    bytes_total: AtomicU64,
    bytes_done: AtomicU64,
    workers: Mutex<HashMap<usize, WorkerStatus>>,
}

impl ProgressTracker {
    pub fn new(files_total: u64, bytes_total: u64) -> Self {
        Self {
            started_at: Instant::now(),
            files_total: AtomicU64::new(files_total),
            files_done: AtomicU64::new(0),
            bytes_total: AtomicU64::new(bytes_total),
            bytes_done: AtomicU64::new(0),
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn add_bytes(&self, n: u64) {
        self.bytes_done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn file_completed(&self) {
        self.files_done.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_worker_status(&self, worker_id: usize, current_key: Option<String>, bytes_done: u64) {
        let mut guard = self.workers.lock().expect("progress worker map poisoned");
        guard.insert(worker_id, WorkerStatus { worker_id, current_key, bytes_done });
    }

    pub fn clear_worker_status(&self, worker_id: usize) {
        let mut guard = self.workers.lock().expect("progress worker map poisoned");
        guard.remove(&worker_id);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let bytes_done = self.bytes_done.load(Ordering::Relaxed);
        let bytes_total = self.bytes_total.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        let bytes_per_sec = if elapsed > 0.0 { bytes_done as f64 / elapsed } else { 0.0 };
        let eta_secs = if bytes_per_sec > 0.0 && bytes_total >= bytes_done {
            Some((bytes_total - bytes_done) as f64 / bytes_per_sec)
        } else {
            None
        };
        let workers = {
            let guard = self.workers.lock().expect("progress worker map poisoned");
            let mut v: Vec<WorkerStatus> = guard.values().cloned().collect();
            v.sort_by_key(|w| w.worker_id);
            v
        };
        ProgressSnapshot {
            files_total: self.files_total.load(Ordering::Relaxed),
            files_done: self.files_done.load(Ordering::Relaxed),
            bytes_total,
            bytes_done,
            bytes_per_sec,
            eta_secs,
            workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_progress() {
        let tracker = ProgressTracker::new(3, 300);
        tracker.add_bytes(100);
        tracker.file_completed();
        let snap = tracker.snapshot();
        assert_eq!(snap.files_total, 3);
        assert_eq!(snap.files_done, 1);
        assert_eq!(snap.bytes_done, 100);
        assert_eq!(snap.bytes_total, 300);
    }

    #[test]
    fn worker_status_round_trips() {
        let tracker = ProgressTracker::new(1, 10);
        tracker.set_worker_status(0, Some("key.txt".to_string()), 5);
        let snap = tracker.snapshot();
        assert_eq!(snap.workers.len(), 1);
        assert_eq!(snap.workers[0].current_key.as_deref(), Some("key.txt"));
        tracker.clear_worker_status(0);
        assert!(tracker.snapshot().workers.is_empty());
    }

    #[test]
    fn zero_elapsed_has_no_eta() {
        let tracker = ProgressTracker::new(1, 0);
        let snap = tracker.snapshot();
        assert_eq!(snap.bytes_per_sec, 0.0);
        assert!(snap.eta_secs.is_none() || snap.eta_secs == Some(0.0));
    }
}

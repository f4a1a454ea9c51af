use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::cancellation::CancellationToken;
use crate::model::{Job, UploadResult};

/// A fixed-size pool of worker threads consuming `Job`s from a bounded
/// channel and producing `UploadResult`s on another. Cancellation is
/// cooperative: in-flight jobs finish (or abort their own multipart
/// session), queued jobs are dropped once the cancellation flag is set.
pub struct WorkerPool {
    worker_count: usize,
    jobs_submitted: AtomicUsize,
}

impl WorkerPool {
    pub fn new(worker_count: usize) -> Self {
        Self { worker_count: worker_count.max(1), jobs_submitted: AtomicUsize::new(0) }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run `jobs` through `worker_count` threads, calling `handle` for each
    /// job on whichever worker picks it up. `handle` must be safe to call
    /// concurrently from multiple threads. Returns one `UploadResult` per
    /// job that was actually dispatched (queued jobs that never started
    /// because of cancellation are not represented).
    pub fn run<F>(&self, jobs: Vec<Job>, cancel: &CancellationToken, handle: F) -> Vec<UploadResult>
    where
        F: Fn(Job) -> UploadResult + Send + Sync,
    {
        let capacity = (self.worker_count * 2).max(1);
        let (job_tx, job_rx): (Sender<Job>, Receiver<Job>) = bounded(capacity);
        let (result_tx, result_rx) = bounded(jobs.len().max(1));

        let handle = Arc::new(handle);
        std::thread::scope(|scope| {
            for _ in 0..self.worker_count {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let handle = Arc::clone(&handle);
                scope.spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let result = handle(job);
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            let feeder = scope.spawn(|| {
                for job in jobs {
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.jobs_submitted.fetch_add(1, Ordering::Relaxed);
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
            });

            let results: Vec<UploadResult> = result_rx.iter().collect();
            let _ = feeder.join();
            results
        })
    }
}

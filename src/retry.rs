use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::UploadError;

/// Which part of an upload an operation belongs to, so the retry wrapper can
/// ask the right classifier on `UploadError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    PreTransfer,
    DuringTransfer,
}

impl RetryPhase {
    fn is_retriable(self, err: &UploadError) -> bool {
        match self {
            RetryPhase::PreTransfer => err.is_retriable_pre_transfer(),
            RetryPhase::DuringTransfer => err.is_retriable_during_transfer(),
        }
    }
}

// Base backoff in milliseconds before the first retry. Doubles each attempt,
// capped at BACKOFF_CAP_MS.
static BACKOFF_BASE_MS: AtomicU64 = AtomicU64::new(1000);
const BACKOFF_CAP_MS: u64 = 30_000;

pub fn set_backoff_base_ms(ms: u64) {
    BACKOFF_BASE_MS.store(ms, Ordering::SeqCst);
}

pub fn get_backoff_base_ms() -> u64 {
    BACKOFF_BASE_MS.load(Ordering::SeqCst)
}

/// Exponential backoff delay for the given zero-based attempt number,
/// capped at 30s: 1s, 2s, 4s, 8s, 16s, 30s, 30s, ...
pub fn compute_backoff_ms(attempt: u32) -> u64 {
    let base = BACKOFF_BASE_MS.load(Ordering::SeqCst);
    base.saturating_mul(1u64 << attempt.min(10)).min(BACKOFF_CAP_MS)
}

/// Run `op` up to `max_retries + 1` times, sleeping with capped exponential
/// backoff between attempts, stopping early if `cancelled` becomes true or
/// the error is not retriable for `phase`.
pub fn retry_with_backoff<F, T>(
    max_retries: u32,
    phase: RetryPhase,
    cancelled: &dyn Fn() -> bool,
    mut op: F,
) -> (Result<T, UploadError>, u32)
where
    F: FnMut() -> Result<T, UploadError>,
{
    let mut attempts = 0u32;
    loop {
        if cancelled() {
            return (Err(UploadError::Cancelled), attempts);
        }
        attempts += 1;
        match op() {
            Ok(v) => return (Ok(v), attempts),
            Err(e) => {
                let retriable = phase.is_retriable(&e);
                if !retriable || attempts > max_retries {
                    return (Err(e), attempts);
                }
                let wait = compute_backoff_ms(attempts - 1);
                std::thread::sleep(Duration::from_millis(wait));
            }
        }
    }
}

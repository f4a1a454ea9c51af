use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation handle shared across a pool's worker threads.
///
/// Workers poll `is_cancelled` between units of work; nothing here preempts
/// a thread mid-syscall.
#[derive(Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)) }
    }

    /// A token that reports not-cancelled and can never be cancelled. Used
    /// for cleanup paths (e.g. `abort_multipart`) that must run to
    /// completion even after the caller's own token fired.
    pub fn detached() -> Self {
        Self::new()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let t = CancellationToken::new();
        assert!(!t.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_across_clones() {
        let t = CancellationToken::new();
        let clone = t.clone();
        clone.cancel();
        assert!(t.is_cancelled());
    }

    #[test]
    fn detached_is_independent() {
        let t = CancellationToken::new();
        t.cancel();
        let d = CancellationToken::detached();
        assert!(!d.is_cancelled());
    }
}

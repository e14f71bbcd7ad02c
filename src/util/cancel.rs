use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, advisory cancellation signal.
///
/// Clones observe the same flag. Tasks poll [`is_cancelled`] at cheap points
/// (between pipeline stages, while waiting on a child process) and stop
/// early; nothing is interrupted forcibly.
///
/// [`is_cancelled`]: CancellationToken::is_cancelled
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

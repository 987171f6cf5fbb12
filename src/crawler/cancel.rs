//! Cooperative cancellation flag shared between the crawl loop and its callers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cloneable cancellation flag
///
/// All clones observe the same flag. Cancellation is one-way; a token
/// cannot be reset, a new run gets a new token.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation
    ///
    /// Returns true only for the call that actually flipped the flag, so
    /// callers can announce the cancellation exactly once.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Returns true once any clone has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

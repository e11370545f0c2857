//! Debounce helper for search-as-you-type.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Trailing-edge debouncer.
///
/// Each call to [`Debouncer::settle`] waits out the window and reports whether
/// it was the last call made during that time. Only the last caller acts.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    generation: AtomicU64,
}

impl Debouncer {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Wait for the window; `true` if no newer call arrived meanwhile.
    pub async fn settle(&self) -> bool {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.window).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

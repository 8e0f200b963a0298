use std::time::Duration;

/// Client-side pacing gate for the mailbox service API.
///
/// The service allows a fixed number of calls per window. The limiter counts
/// calls and pauses the whole session for the cooldown once the budget is
/// spent. The count is process-local: a fresh run starts at zero even if the
/// server-side window still remembers earlier calls.
pub struct RateLimiter {
    count: u32,
    threshold: u32,
    cooldown: Duration,
}

pub const CALL_THRESHOLD: u32 = 20;
pub const COOLDOWN_SECS: u64 = 60;

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            count: 0,
            threshold: CALL_THRESHOLD,
            cooldown: Duration::from_secs(COOLDOWN_SECS),
        }
    }

    /// Call before every request to the mailbox service.
    ///
    /// The 20th consecutive permit pauses for the cooldown and resets the
    /// count, so the 21st starts a fresh budget.
    pub async fn permit(&mut self) {
        if let Some(pause) = self.acquire() {
            log::debug!(
                "API call budget exhausted, sleeping {}s before continuing",
                pause.as_secs()
            );
            tokio::time::sleep(pause).await;
        }
    }

    // Counting is separated from sleeping so the threshold arithmetic can be
    // tested without waiting out a cooldown.
    fn acquire(&mut self) -> Option<Duration> {
        self.count += 1;
        if self.count == self.threshold {
            self.count = 0;
            Some(self.cooldown)
        } else {
            None
        }
    }

    #[cfg(test)]
    fn count(&self) -> u32 {
        self.count
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

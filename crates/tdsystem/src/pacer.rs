use std::time::{Duration, Instant};

/// Default spacing between two requests to the site.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Keeps consecutive requests at least `interval` apart.
///
/// Owned by the scraper; each [`Pacer::wait`] sleeps out whatever is left of
/// the interval since the previous call.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Time still to wait at `now` before the next request may go out.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    pub async fn wait(&mut self) {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            log::debug!("Waiting {:?} before next request", remaining);
            tokio::time::sleep(remaining).await;
        }
        self.last = Some(Instant::now());
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

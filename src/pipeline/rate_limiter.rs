use std::time::Duration;
use tokio::time::Instant;

/// Minimum spacing between the starts of consecutive dispatch calls.
///
/// This only ever delays the caller: there is no bucket, no queue and nothing
/// is dropped. It exists so a downstream API with a per-second limit never sees
/// two batches closer together than `floor`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    floor: Duration,
}

impl RateLimiter {
    pub fn new(floor: Duration) -> Self {
        Self { floor }
    }

    pub fn floor(&self) -> Duration {
        self.floor
    }

    /// Block until `floor` has passed since `last_dispatch`, returning how long
    /// we actually waited. The first dispatch (`None`) goes straight through.
    pub async fn wait_for_next(&self, last_dispatch: Option<Instant>) -> Duration {
        let last = match last_dispatch {
            Some(t) => t,
            None => return Duration::ZERO,
        };
        let ready_at = last + self.floor;
        let now = Instant::now();
        if now >= ready_at {
            return Duration::ZERO;
        }
        tokio::time::sleep_until(ready_at).await;
        ready_at - now
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::constants::DEFAULT_DISPATCH_FLOOR_MS))
    }
}

//! Global single-slot rate limiter for AI calls.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, Instant};
use tracing::debug;

/// Serializes AI calls process-wide and enforces a cooldown between two
/// consecutive calls. The mutex is held across the wait and the call itself,
/// so concurrent callers queue end to end and the cooldown is measured from
/// the previous call's completion, whatever its outcome.
pub struct AiCallGate {
    cooldown: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl AiCallGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_call: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Run `call` once the cooldown since the previous call has elapsed.
    pub async fn throttled<F, T>(&self, call: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.cooldown {
                let wait = self.cooldown - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "ai cooldown, waiting");
                time::sleep(wait).await;
            }
        }

        let output = call.await;
        *last_call = Some(Instant::now());
        output
    }
}

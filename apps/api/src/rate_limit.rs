//! Best-effort in-memory rate limiter.
//!
//! Fixed-window counters keyed by caller identity, owned by the hosting
//! process and injected through `AppState` — deliberately not a module-level
//! global. `start()` spawns a background sweep that drops expired windows;
//! `shutdown()` stops it. Losing the counters on restart is acceptable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            sweeper: Mutex::new(None),
        }
    }

    /// Records one request for `key`. Returns false when the caller has
    /// exhausted the current window.
    pub fn check(&self, key: &str) -> bool {
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let now = Instant::now();

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }

    /// Spawns the background sweep. Call once at startup.
    pub fn start(&self) {
        let windows = Arc::clone(&self.windows);
        let window_len = self.window;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(window_len.max(Duration::from_secs(1)));
            loop {
                ticker.tick().await;
                let mut map = windows.lock().expect("rate limiter lock poisoned");
                let before = map.len();
                let now = Instant::now();
                map.retain(|_, w| now.duration_since(w.started) < window_len);
                let swept = before - map.len();
                if swept > 0 {
                    debug!("Rate limiter swept {swept} expired windows");
                }
            }
        });

        *self.sweeper.lock().expect("rate limiter lock poisoned") = Some(handle);
        info!(
            "Rate limiter started: {} requests per {:?}",
            self.max_requests, self.window
        );
    }

    /// Stops the background sweep. Idempotent.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .expect("rate limiter lock poisoned")
            .take()
        {
            handle.abort();
            info!("Rate limiter sweep stopped");
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("user-a"));
        assert!(limiter.check("user-a"));
        assert!(!limiter.check("user-a"), "Third request in window rejected");
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("user-a"));
        assert!(limiter.check("user-b"), "Other callers unaffected");
        assert!(!limiter.check("user-a"));
    }

    #[test]
    fn test_window_expiry_resets_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        assert!(limiter.check("user-a"));
        assert!(!limiter.check("user-a"));
        std::thread::sleep(Duration::from_millis(20));
        assert!(limiter.check("user-a"), "New window after expiry");
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10));
        limiter.check("user-a");
        std::thread::sleep(Duration::from_millis(20));

        // Sweep logic, exercised directly: expired entries are dropped
        {
            let mut map = limiter.windows.lock().unwrap();
            let now = Instant::now();
            map.retain(|_, w| now.duration_since(w.started) < limiter.window);
            assert!(map.is_empty());
        }

        limiter.start();
        limiter.shutdown();
    }
}

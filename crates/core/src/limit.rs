use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fixed-window rate limiter, injected into the request path rather than held
/// as a process global. Expired windows are dropped lazily on access and in
/// bulk by [`RateLimiter::sweep`], which the serving binary runs periodically.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records one request for `key` and reports whether it is allowed.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");

        let window = windows
            .entry(key.to_string())
            .or_insert(Window { started: now, count: 0 });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        window.count += 1;
        window.count <= self.max_requests
    }

    /// Drops every expired window so the map stays bounded by active keys.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        windows.retain(|_, w| now.duration_since(w.started) < self.window);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_denies() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.check("ws-a"));
        assert!(limiter.check("ws-a"));
        assert!(limiter.check("ws-a"));
        assert!(!limiter.check("ws-a"));
        // Other keys are unaffected.
        assert!(limiter.check("ws-b"));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check("ws-a"));
        assert!(!limiter.check("ws-a"));
        std::thread::sleep(Duration::from_millis(25));
        assert!(limiter.check("ws-a"));
    }

    #[test]
    fn sweep_evicts_expired_windows_only() {
        let limiter = RateLimiter::new(10, Duration::from_millis(20));
        limiter.check("stale");
        std::thread::sleep(Duration::from_millis(25));
        limiter.check("fresh");
        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.check("fresh"));
    }
}

use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// A fixed-window rate limit: at most `max` requests per client per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub window: Duration,
    pub max: u32,
}

impl RatePolicy {
    pub const fn new(window: Duration, max: u32) -> Self {
        Self { window, max }
    }
}

/// Per-client counter state for the current window.
#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Outcome of a rate-limit check, with the fields the draft-standard
/// `RateLimit-*` response headers need.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's current window resets.
    pub reset_after: Duration,
}

/// Fixed-window request counter keyed by client IP.
///
/// Each instance owns an independent state map, so stacking two policies
/// (say, a global catch-all and an endpoint-specific one) means two
/// instances checked in sequence.
///
/// Windows are client-relative, starting at the client's first request and
/// resetting once the window has fully elapsed. Known limitation of the
/// algorithm: a client can burst up to 2× `max` across a window boundary.
pub struct FixedWindowLimiter {
    policy: RatePolicy,
    clients: Mutex<HashMap<IpAddr, WindowState>>,
}

impl FixedWindowLimiter {
    pub fn new(policy: RatePolicy) -> Self {
        Self {
            policy,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Count a request from `client` and decide whether it is allowed.
    ///
    /// The counter keeps incrementing while the client is over the limit;
    /// only a fully elapsed window resets it.
    pub fn check(&self, client: IpAddr) -> Decision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> Decision {
        let mut clients = self.clients.lock();
        let state = clients.entry(client).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(state.window_start) >= self.policy.window {
            state.count = 0;
            state.window_start = now;
        }
        state.count += 1;

        Decision {
            allowed: state.count <= self.policy.max,
            limit: self.policy.max,
            remaining: self.policy.max.saturating_sub(state.count),
            reset_after: self
                .policy
                .window
                .saturating_sub(now.duration_since(state.window_start)),
        }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([192, 168, 1, last])
    }

    #[test]
    fn allows_up_to_max() {
        let limiter = FixedWindowLimiter::new(RatePolicy::new(WINDOW, 3));
        let now = Instant::now();

        assert!(limiter.check_at(ip(1), now).allowed);
        assert!(limiter.check_at(ip(1), now).allowed);
        assert!(limiter.check_at(ip(1), now).allowed);
        assert!(!limiter.check_at(ip(1), now).allowed);
    }

    #[test]
    fn clients_are_independent() {
        let limiter = FixedWindowLimiter::new(RatePolicy::new(WINDOW, 2));
        let now = Instant::now();

        limiter.check_at(ip(1), now);
        limiter.check_at(ip(1), now);
        assert!(!limiter.check_at(ip(1), now).allowed);

        // A different client's counter is untouched
        assert!(limiter.check_at(ip(2), now).allowed);
    }

    #[test]
    fn window_elapse_resets_counter() {
        let limiter = FixedWindowLimiter::new(RatePolicy::new(WINDOW, 2));
        let start = Instant::now();

        limiter.check_at(ip(1), start);
        limiter.check_at(ip(1), start);
        assert!(!limiter.check_at(ip(1), start).allowed);

        // One second short of the boundary: still rejected
        let almost = start + Duration::from_secs(59);
        assert!(!limiter.check_at(ip(1), almost).allowed);

        // Window elapsed: fresh counter
        let later = start + Duration::from_secs(60);
        assert!(limiter.check_at(ip(1), later).allowed);
    }

    #[test]
    fn counter_keeps_incrementing_past_max() {
        let limiter = FixedWindowLimiter::new(RatePolicy::new(WINDOW, 1));
        let now = Instant::now();

        limiter.check_at(ip(1), now);
        let d = limiter.check_at(ip(1), now);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);

        // Rejected requests still count; remaining saturates at zero
        let d = limiter.check_at(ip(1), now);
        assert!(!d.allowed);
        assert_eq!(d.remaining, 0);
    }

    #[test]
    fn decision_header_fields() {
        let limiter = FixedWindowLimiter::new(RatePolicy::new(WINDOW, 5));
        let start = Instant::now();

        let d = limiter.check_at(ip(1), start);
        assert_eq!(d.limit, 5);
        assert_eq!(d.remaining, 4);
        assert_eq!(d.reset_after, WINDOW);

        let d = limiter.check_at(ip(1), start + Duration::from_secs(20));
        assert_eq!(d.remaining, 3);
        assert_eq!(d.reset_after, Duration::from_secs(40));
    }

    #[test]
    fn boundary_burst_is_possible() {
        // Documented fixed-window limitation: max requests right before the
        // boundary plus max right after all pass.
        let limiter = FixedWindowLimiter::new(RatePolicy::new(WINDOW, 2));
        let start = Instant::now();

        assert!(limiter.check_at(ip(1), start + Duration::from_secs(58)).allowed);
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(59)).allowed);
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(60) + Duration::from_secs(58)).allowed);
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(60) + Duration::from_secs(59)).allowed);
    }

    #[test]
    fn concurrent_checks_do_not_lose_counts() {
        use std::sync::Arc;
        use std::thread;

        let limiter = Arc::new(FixedWindowLimiter::new(RatePolicy::new(WINDOW, 100)));
        let mut handles = vec![];

        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            handles.push(thread::spawn(move || {
                let mut allowed = 0u32;
                for _ in 0..50 {
                    if limiter.check(ip(1)).allowed {
                        allowed += 1;
                    }
                }
                allowed
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 400 checks against a limit of 100: exactly 100 may pass
        assert_eq!(total, 100);
    }
}

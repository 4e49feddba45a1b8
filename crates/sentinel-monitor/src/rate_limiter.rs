//! # Rate Limiter
//!
//! Dual sliding-window request throttling keyed on client identity.
//!
//! ## Design
//!
//! Each client gets a bounded `VecDeque<Instant>` of recent request
//! timestamps, mirroring the bounded-collection-with-eviction idiom used
//! for context frames elsewhere in this crate: old timestamps are popped
//! from the front once they fall outside the window rather than the
//! deque growing without bound.
//!
//! Two independent horizons are tracked per client - a 60 second window
//! and a 3600 second window - each with its own limit. A request is
//! accepted only if both windows have room.
//!
//! ## Profiles
//!
//! Two caps apply depending on which URL prefix the caller hit: a
//! permissive general profile for ordinary API traffic, and a stricter
//! OAuth profile for the token-exchange endpoints, which should see
//! infrequent, low-volume traffic. The caller selects the profile per
//! request; the limiter does not inspect the request itself.
//!
//! ## Security Notes
//!
//! Stale client entries are removed by a periodic sweep rather than on
//! every request, so memory use does not grow unbounded in a deployment
//! with many short-lived clients. The sweep interval MUST be at least 60
//! seconds to avoid evicting an entry mid-window.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{MonitorError, Result};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Minimum allowed sweep interval, to avoid evicting a client's history
/// mid-window.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Which cap applies to a request, selected by the caller based on URL
/// prefix (e.g. `/oauth/...` routes select [`Profile::Oauth`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    General,
    Oauth,
}

/// A per-minute/per-hour cap pair.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub per_minute: u32,
    pub per_hour: u32,
}

/// Tunable limits for [`RateLimiter`], one pair of caps per [`Profile`].
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub general: Limits,
    pub oauth: Limits,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            general: Limits {
                per_minute: 1000,
                per_hour: 10_000,
            },
            oauth: Limits {
                per_minute: 10,
                per_hour: 30,
            },
        }
    }
}

struct ClientWindow {
    minute: VecDeque<Instant>,
    hour: VecDeque<Instant>,
    last_seen: Instant,
}

impl ClientWindow {
    fn new(now: Instant) -> Self {
        Self {
            minute: VecDeque::new(),
            hour: VecDeque::new(),
            last_seen: now,
        }
    }

    fn evict_stale(&mut self, now: Instant) {
        while matches!(self.minute.front(), Some(t) if now.duration_since(*t) > MINUTE) {
            self.minute.pop_front();
        }
        while matches!(self.hour.front(), Some(t) if now.duration_since(*t) > HOUR) {
            self.hour.pop_front();
        }
    }
}

/// Remaining quota and reset metadata for a client, surfaced as
/// `X-RateLimit-{Limit,Remaining}-{Minute,Hour}` response headers by the
/// gateway facade.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitStatus {
    pub limit_minute: u32,
    pub remaining_minute: u32,
    pub limit_hour: u32,
    pub remaining_hour: u32,
}

/// Dual sliding-window rate limiter, one window pair per `(client,
/// profile)` key.
pub struct RateLimiter {
    config: RateLimiterConfig,
    clients: Mutex<HashMap<(String, Profile), ClientWindow>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn limits_for(&self, profile: Profile) -> Limits {
        match profile {
            Profile::General => self.config.general,
            Profile::Oauth => self.config.oauth,
        }
    }

    /// Registers a request from `client` under `profile`, accepting it
    /// if both windows have room. Returns
    /// [`MonitorError::RateLimitExceeded`] otherwise.
    pub fn check(&self, client: &str, profile: Profile, now: Instant) -> Result<RateLimitStatus> {
        self.check_with_limits(client, profile, now, None)
    }

    /// Same as [`Self::check`], but `override_limits` - when present -
    /// replaces the profile's configured caps for this call. Used to apply
    /// an API key's own per-minute/per-hour caps instead of the
    /// gateway-wide profile defaults.
    pub fn check_with_limits(
        &self,
        client: &str,
        profile: Profile,
        now: Instant,
        override_limits: Option<Limits>,
    ) -> Result<RateLimitStatus> {
        let limits = override_limits.unwrap_or_else(|| self.limits_for(profile));

        let mut clients = self.clients.lock();
        let window = clients
            .entry((client.to_string(), profile))
            .or_insert_with(|| ClientWindow::new(now));
        window.last_seen = now;
        window.evict_stale(now);

        if window.minute.len() as u32 >= limits.per_minute {
            let retry_after = window
                .minute
                .front()
                .map(|t| MINUTE.saturating_sub(now.duration_since(*t)).as_secs().max(1))
                .unwrap_or(60);
            return Err(MonitorError::RateLimitExceeded {
                client: client.to_string(),
                retry_after_secs: retry_after,
            });
        }

        if window.hour.len() as u32 >= limits.per_hour {
            let retry_after = window
                .hour
                .front()
                .map(|t| HOUR.saturating_sub(now.duration_since(*t)).as_secs().max(1))
                .unwrap_or(3600);
            return Err(MonitorError::RateLimitExceeded {
                client: client.to_string(),
                retry_after_secs: retry_after,
            });
        }

        window.minute.push_back(now);
        window.hour.push_back(now);

        Ok(RateLimitStatus {
            limit_minute: limits.per_minute,
            remaining_minute: limits.per_minute - window.minute.len() as u32,
            limit_hour: limits.per_hour,
            remaining_hour: limits.per_hour - window.hour.len() as u32,
        })
    }

    /// Drops client entries that have had no activity for longer than
    /// `max_idle`. Callers should invoke this on a timer of at least
    /// [`MIN_SWEEP_INTERVAL`].
    pub fn sweep(&self, now: Instant, max_idle: Duration) -> usize {
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, window| now.duration_since(window.last_seen) <= max_idle);
        before - clients.len()
    }

    /// Number of `(client, profile)` entries currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_limit() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            general: Limits { per_minute: 5, per_hour: 100 },
            oauth: Limits { per_minute: 10, per_hour: 30 },
        });
        let now = Instant::now();
        for _ in 0..5 {
            assert!(limiter.check("client-a", Profile::General, now).is_ok());
        }
    }

    #[test]
    fn rejects_once_minute_limit_hit() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            general: Limits { per_minute: 3, per_hour: 100 },
            oauth: Limits { per_minute: 10, per_hour: 30 },
        });
        let now = Instant::now();
        for _ in 0..3 {
            limiter.check("client-a", Profile::General, now).unwrap();
        }
        let result = limiter.check("client-a", Profile::General, now);
        assert!(matches!(result, Err(MonitorError::RateLimitExceeded { .. })));
    }

    #[test]
    fn window_clears_after_minute_elapses() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            general: Limits { per_minute: 2, per_hour: 100 },
            oauth: Limits { per_minute: 10, per_hour: 30 },
        });
        let now = Instant::now();
        limiter.check("client-a", Profile::General, now).unwrap();
        limiter.check("client-a", Profile::General, now).unwrap();
        assert!(limiter.check("client-a", Profile::General, now).is_err());

        let later = now + Duration::from_secs(61);
        assert!(limiter.check("client-a", Profile::General, later).is_ok());
    }

    #[test]
    fn oauth_profile_is_stricter_than_general() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check("client-a", Profile::Oauth, now).is_ok());
        }
        assert!(limiter.check("client-a", Profile::Oauth, now).is_err());
        // the general profile for the same client is unaffected
        assert!(limiter.check("client-a", Profile::General, now).is_ok());
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            general: Limits { per_minute: 1, per_hour: 100 },
            oauth: Limits { per_minute: 10, per_hour: 30 },
        });
        let now = Instant::now();
        limiter.check("client-a", Profile::General, now).unwrap();
        assert!(limiter.check("client-a", Profile::General, now).is_err());
        assert!(limiter.check("client-b", Profile::General, now).is_ok());
    }

    #[test]
    fn sweep_drops_idle_clients() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let now = Instant::now();
        limiter.check("client-a", Profile::General, now).unwrap();
        assert_eq!(limiter.tracked_clients(), 1);

        let later = now + Duration::from_secs(7200);
        let dropped = limiter.sweep(later, Duration::from_secs(3600));
        assert_eq!(dropped, 1);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn override_limits_replace_profile_defaults() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        let now = Instant::now();
        let tight = Limits { per_minute: 1, per_hour: 100 };

        assert!(limiter.check_with_limits("client-a", Profile::General, now, Some(tight)).is_ok());
        assert!(limiter.check_with_limits("client-a", Profile::General, now, Some(tight)).is_err());

        // the unscoped default caps are unaffected for a different client
        assert!(limiter.check("client-b", Profile::General, now).is_ok());
    }

    #[test]
    fn status_reports_remaining_quota() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            general: Limits { per_minute: 10, per_hour: 100 },
            oauth: Limits { per_minute: 10, per_hour: 30 },
        });
        let now = Instant::now();
        let status = limiter.check("client-a", Profile::General, now).unwrap();
        assert_eq!(status.limit_minute, 10);
        assert_eq!(status.remaining_minute, 9);
    }
}

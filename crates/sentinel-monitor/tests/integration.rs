//! End-to-end coverage for [`RateLimiter`] driven entirely through its
//! public API, complementing the in-module unit tests with scenarios
//! that mix profiles, clients, and sweeps in one limiter instance.

use std::time::{Duration, Instant};

use sentinel_monitor::{Limits, MonitorError, Profile, RateLimiter, RateLimiterConfig};

fn limiter(general: Limits, oauth: Limits) -> RateLimiter {
    RateLimiter::new(RateLimiterConfig { general, oauth })
}

#[test]
fn general_and_oauth_profiles_track_independent_quotas_for_the_same_client() {
    let rl = limiter(Limits { per_minute: 5, per_hour: 50 }, Limits { per_minute: 2, per_hour: 10 });
    let now = Instant::now();

    rl.check("client-a", Profile::Oauth, now).unwrap();
    rl.check("client-a", Profile::Oauth, now).unwrap();
    assert!(matches!(rl.check("client-a", Profile::Oauth, now), Err(MonitorError::RateLimitExceeded { .. })));

    // the general profile for the same client still has room
    assert!(rl.check("client-a", Profile::General, now).is_ok());
}

#[test]
fn hourly_window_catches_bursts_that_dodge_the_minute_window() {
    let rl = limiter(Limits { per_minute: 100, per_hour: 3 }, Limits { per_minute: 10, per_hour: 30 });
    let now = Instant::now();

    // Spread three requests a minute apart so the minute window never
    // trips, but the hour window still only has room for three.
    for i in 0..3 {
        let at = now + Duration::from_secs(i * 60);
        rl.check("client-a", Profile::General, at).unwrap();
    }
    let fourth = now + Duration::from_secs(3 * 60);
    let result = rl.check("client-a", Profile::General, fourth);
    assert!(matches!(result, Err(MonitorError::RateLimitExceeded { .. })));
}

#[test]
fn retry_after_shrinks_as_the_window_approaches_expiry() {
    let rl = limiter(Limits { per_minute: 1, per_hour: 100 }, Limits { per_minute: 10, per_hour: 30 });
    let now = Instant::now();
    rl.check("client-a", Profile::General, now).unwrap();

    let soon_after = now + Duration::from_secs(5);
    match rl.check("client-a", Profile::General, soon_after) {
        Err(MonitorError::RateLimitExceeded { retry_after_secs, .. }) => {
            assert!(retry_after_secs <= 60 && retry_after_secs > 0);
        }
        other => panic!("expected RateLimitExceeded, got {other:?}"),
    }
}

#[test]
fn sweep_leaves_active_clients_untouched() {
    let rl = limiter(Limits { per_minute: 1000, per_hour: 10_000 }, Limits { per_minute: 10, per_hour: 30 });
    let now = Instant::now();

    rl.check("idle-client", Profile::General, now).unwrap();
    let later = now + Duration::from_secs(120);
    rl.check("active-client", Profile::General, later).unwrap();

    let dropped = rl.sweep(later, Duration::from_secs(60));
    assert_eq!(dropped, 1);
    assert_eq!(rl.tracked_clients(), 1);
}

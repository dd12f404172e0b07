//! Rate limiting middleware
//!
//! Fixed-window counters kept in process memory. Limits are per process and
//! reset on restart.

use std::{collections::HashMap, sync::Mutex};

use axum::{
    body::Body,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::{constants::ANONYMOUS_USER_KEY, state::AppState};

struct Window {
    count: u32,
    resets_at: DateTime<Utc>,
}

#[derive(Default)]
struct Windows {
    by_key: HashMap<String, Window>,
    next_sweep: Option<DateTime<Utc>>,
}

impl Windows {
    /// Drop expired windows at most once per window length
    fn sweep(&mut self, now: DateTime<Utc>, window: Duration) {
        if self.next_sweep.is_some_and(|at| now < at) {
            return;
        }
        self.by_key.retain(|_, w| now <= w.resets_at);
        self.next_sweep = Some(now + window);
    }
}

/// Allows `limit` hits per key per window
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<Windows>,
}

impl FixedWindowLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(Windows::default()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count a hit for `key`; false once the window's budget is spent
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.sweep(now, self.window);

        match windows.by_key.get_mut(key) {
            Some(window) if now <= window.resets_at => {
                if window.count >= self.limit {
                    return false;
                }
                window.count += 1;
                true
            }
            _ => {
                windows.by_key.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        resets_at: now + self.window,
                    },
                );
                true
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitQuery {
    pub user_id: Option<String>,
}

/// Limit NSFW checks per `userId` query parameter
pub async fn nsfw_rate_limit_middleware(
    State(state): State<AppState>,
    Query(query): Query<RateLimitQuery>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = query
        .user_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ANONYMOUS_USER_KEY.to_string());

    let limiter = state.nsfw_limiter();
    if !limiter.check(&key, state.clock().now()) {
        tracing::warn!(user_id = %key, "NSFW check rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": format!(
                    "Rate limit exceeded. Maximum {} checks per minute.",
                    limiter.limit()
                ),
                "retryAfter": limiter.window().num_seconds(),
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_limit_then_rejects() {
        let limiter = FixedWindowLimiter::new(30, Duration::seconds(60));
        let now = Utc::now();

        for _ in 0..30 {
            assert!(limiter.check("user-1", now));
        }
        assert!(!limiter.check("user-1", now));
        assert!(limiter.check("user-2", now));
    }

    #[test]
    fn test_window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::seconds(60));
        let now = Utc::now();

        assert!(limiter.check("anonymous", now));
        assert!(!limiter.check("anonymous", now + Duration::seconds(59)));
        assert!(limiter.check("anonymous", now + Duration::seconds(61)));
    }

    #[test]
    fn test_expired_windows_are_evicted() {
        let limiter = FixedWindowLimiter::new(30, Duration::seconds(60));
        let now = Utc::now();

        for i in 0..10_000 {
            assert!(limiter.check(&format!("user-{}", i), now));
        }
        assert_eq!(limiter.windows.lock().unwrap().by_key.len(), 10_000);

        assert!(limiter.check("late", now + Duration::hours(1)));
        let windows = limiter.windows.lock().unwrap();
        assert_eq!(windows.by_key.len(), 1);
        assert!(windows.by_key.contains_key("late"));
    }

    #[test]
    fn test_sweep_keeps_live_windows() {
        let limiter = FixedWindowLimiter::new(2, Duration::seconds(60));
        let now = Utc::now();

        assert!(limiter.check("old", now));
        assert!(limiter.check("recent", now + Duration::seconds(50)));
        assert!(limiter.check("recent", now + Duration::seconds(70)));
        assert!(!limiter.check("recent", now + Duration::seconds(75)));

        let windows = limiter.windows.lock().unwrap();
        assert!(!windows.by_key.contains_key("old"));
        assert_eq!(windows.by_key["recent"].count, 2);
    }
}

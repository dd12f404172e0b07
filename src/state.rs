//! Application state management
//!
//! This module contains the shared application state that is passed
//! to all request handlers via Axum's State extractor.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    config::Config,
    constants::NSFW_RATE_WINDOW_SECS,
    db::Store,
    middleware::rate_limit::FixedWindowLimiter,
    services::{NsfwCheckLog, NsfwDetector, ObjectStorage},
    utils::Clock,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// Persistence backend (Postgres or in-memory)
    store: Arc<dyn Store>,

    /// Asset bucket
    storage: Arc<dyn ObjectStorage>,

    /// Image classifier for the NSFW pre-check
    detector: Arc<dyn NsfwDetector>,

    /// Per-user limiter for NSFW checks
    nsfw_limiter: FixedWindowLimiter,

    /// Recent NSFW checks
    nsfw_log: NsfwCheckLog,

    clock: Arc<dyn Clock>,

    /// Application configuration
    config: Config,
}

impl AppState {
    /// Create a new application state
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ObjectStorage>,
        detector: Arc<dyn NsfwDetector>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let nsfw_limiter = FixedWindowLimiter::new(
            config.nsfw.checks_per_minute,
            Duration::seconds(NSFW_RATE_WINDOW_SECS),
        );

        Self {
            inner: Arc::new(AppStateInner {
                store,
                storage,
                detector,
                nsfw_limiter,
                nsfw_log: NsfwCheckLog::default(),
                clock,
                config,
            }),
        }
    }

    /// Get a reference to the store
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub fn storage(&self) -> &dyn ObjectStorage {
        self.inner.storage.as_ref()
    }

    pub fn detector(&self) -> &dyn NsfwDetector {
        self.inner.detector.as_ref()
    }

    pub fn nsfw_limiter(&self) -> &FixedWindowLimiter {
        &self.inner.nsfw_limiter
    }

    pub fn nsfw_log(&self) -> &NsfwCheckLog {
        &self.inner.nsfw_log
    }

    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}

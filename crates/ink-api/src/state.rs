use std::sync::Arc;

use chrono::{DateTime, Utc};
use ink_config::{AppConfig, LimitsConfig};

use crate::auth::{RequestGuard, TokenVerifier};
use crate::backend::{AuthProvider, Database};
use crate::llm::LanguageModel;
use crate::rate_limit::{Clock, RateLimiter, SystemClock};

/// Token budgets per call type
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    pub default: u32,
    pub chart: u32,
}

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<RequestGuard>,
    pub auth: Arc<dyn AuthProvider>,
    pub database: Arc<dyn Database>,
    pub llm: Arc<dyn LanguageModel>,
    pub clock: Arc<dyn Clock>,
    pub limits: Arc<LimitsConfig>,
    pub budget: TokenBudget,
}

impl AppState {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        database: Arc<dyn Database>,
        llm: Arc<dyn LanguageModel>,
        config: &AppConfig,
    ) -> Self {
        Self::with_clock(auth, database, llm, config, Arc::new(SystemClock))
    }

    /// Build with an explicit clock shared by the rate limiter and access checks.
    pub fn with_clock(
        auth: Arc<dyn AuthProvider>,
        database: Arc<dyn Database>,
        llm: Arc<dyn LanguageModel>,
        config: &AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rate_limiter = Arc::new(RateLimiter::with_clock(&config.rate_limit, clock.clone()));
        let guard = RequestGuard::new(
            TokenVerifier::new(auth.clone()),
            database.clone(),
            rate_limiter,
            clock.clone(),
        );

        Self {
            guard: Arc::new(guard),
            auth,
            database,
            llm,
            clock,
            limits: Arc::new(config.limits.clone()),
            budget: TokenBudget {
                default: config.llm.max_tokens,
                chart: config.llm.chart_max_tokens,
            },
        }
    }

    /// Current time from the shared clock, RFC 3339.
    pub fn now_rfc3339(&self) -> String {
        let millis = i64::try_from(self.clock.now_millis()).unwrap_or(i64::MAX);
        DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or_else(Utc::now)
            .to_rfc3339()
    }
}

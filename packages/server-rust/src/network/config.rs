//! HTTP transport configuration.

use std::time::Duration;

/// Settings for the HTTP listener and its middleware stack.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Allowed CORS origins. `"*"` allows any.
    pub cors_origins: Vec<String>,
    /// Upper bound for one request, also used as the call deadline.
    pub request_timeout: Duration,
    /// How long shutdown waits for in-flight calls.
    pub drain_timeout: Duration,
    /// Global request rate limit. `None` disables limiting.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(30),
            rate_limit: None,
        }
    }
}

/// Token bucket shared by all callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained requests per second.
    pub per_second: u64,
    /// Requests allowed in a burst.
    pub burst: u32,
}

impl RateLimitConfig {
    /// Interval after which one request of quota is replenished.
    #[must_use]
    pub fn replenish_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.per_second.max(1))
    }
}

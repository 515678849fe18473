//! Command-line and environment configuration.
//!
//! Every flag has a `GUESTLIST_*` environment variable; flags win over the
//! environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde_json::json;

use crate::network::{NetworkConfig, RateLimitConfig};
use crate::rpc::RpcConfig;
use crate::telemetry::LogFormat;

#[derive(Debug, Clone, Parser)]
#[command(name = "guestlist-server", version, about = "Guest directory over HTTP and RPC")]
pub struct Cli {
    #[arg(long, env = "GUESTLIST_HTTP_HOST", default_value = "0.0.0.0")]
    pub http_host: String,

    #[arg(long, env = "GUESTLIST_HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Per-request timeout on the HTTP transport.
    #[arg(long, env = "GUESTLIST_HTTP_TIMEOUT_SEC", default_value_t = 86_400)]
    pub http_timeout_sec: u64,

    #[arg(long, env = "GUESTLIST_RPC_PORT", default_value_t = 9194)]
    pub rpc_port: u16,

    /// Idle connection timeout on the RPC transport.
    #[arg(long, env = "GUESTLIST_RPC_TIMEOUT_SEC", default_value_t = 86_400)]
    pub rpc_timeout_sec: u64,

    #[arg(long, env = "GUESTLIST_RPC_MAX_FRAME_BYTES", default_value_t = 4 * 1024 * 1024)]
    pub rpc_max_frame_bytes: usize,

    /// `PostgreSQL` URL. Without it guests are kept in memory.
    #[arg(long, env = "GUESTLIST_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "GUESTLIST_DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub database_max_connections: u32,

    /// JSON array of guests loaded into the in-memory store.
    #[arg(long, env = "GUESTLIST_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Default filter when `RUST_LOG` is unset.
    #[arg(long, env = "GUESTLIST_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "GUESTLIST_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[arg(long, env = "GUESTLIST_METRICS_ENABLED")]
    pub metrics_enabled: bool,

    #[arg(long, env = "GUESTLIST_METRICS_PORT", default_value_t = 9153)]
    pub metrics_port: u16,

    #[arg(long, env = "GUESTLIST_TRACER_ENABLED")]
    pub tracer_enabled: bool,

    #[arg(long, env = "GUESTLIST_TRACER_NAME", default_value = "guestlist")]
    pub tracer_name: String,

    #[arg(long, env = "GUESTLIST_REPORTER_ENABLED")]
    pub reporter_enabled: bool,

    /// Webhook receiving error reports. Reports are logged when unset.
    #[arg(long, env = "GUESTLIST_REPORTER_DSN")]
    pub reporter_dsn: Option<String>,

    #[arg(long, env = "GUESTLIST_REPORTER_ENVIRONMENT", default_value = "local")]
    pub reporter_environment: String,

    #[arg(long, env = "GUESTLIST_LIMITER_ENABLED")]
    pub limiter_enabled: bool,

    /// Requests per second across all HTTP callers.
    #[arg(long, env = "GUESTLIST_LIMITER_LIMIT", default_value_t = 10_000)]
    pub limiter_limit: u32,

    /// How long shutdown waits for in-flight calls.
    #[arg(long, env = "GUESTLIST_DRAIN_TIMEOUT_SEC", default_value_t = 30)]
    pub drain_timeout_sec: u64,
}

impl Cli {
    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.http_host.clone(),
            port: self.http_port,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(self.http_timeout_sec),
            drain_timeout: Duration::from_secs(self.drain_timeout_sec),
            rate_limit: self.limiter_enabled.then(|| RateLimitConfig {
                per_second: u64::from(self.limiter_limit),
                burst: self.limiter_limit,
            }),
        }
    }

    #[must_use]
    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            host: self.http_host.clone(),
            port: self.rpc_port,
            idle_timeout: Duration::from_secs(self.rpc_timeout_sec),
            max_frame_length: self.rpc_max_frame_bytes,
            request_timeout: Duration::from_secs(self.rpc_timeout_sec),
            drain_timeout: Duration::from_secs(self.drain_timeout_sec),
        }
    }

    /// Effective configuration as JSON, with secrets masked.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "http": {
                "host": self.http_host,
                "port": self.http_port,
                "timeout_sec": self.http_timeout_sec,
            },
            "rpc": {
                "port": self.rpc_port,
                "timeout_sec": self.rpc_timeout_sec,
                "max_frame_bytes": self.rpc_max_frame_bytes,
            },
            "database": {
                "url": self.database_url.as_deref().map(redact_url),
                "max_connections": self.database_max_connections,
                "seed_file": self.seed_file,
            },
            "metrics": { "enabled": self.metrics_enabled, "port": self.metrics_port },
            "tracer": { "enabled": self.tracer_enabled, "name": self.tracer_name },
            "reporter": {
                "enabled": self.reporter_enabled,
                "dsn": self.reporter_dsn.as_deref().map(redact_url),
                "environment": self.reporter_environment,
            },
            "limiter": { "enabled": self.limiter_enabled, "limit": self.limiter_limit },
        })
    }
}

/// Replaces the password of a URL with `******`.
fn redact_url(raw: &str) -> String {
    match reqwest::Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("******")).is_err() {
                return "******".to_string();
            }
            url.to_string()
        }
        Err(_) => "******".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_option_table() {
        let cli = Cli::parse_from(["guestlist-server"]);
        assert_eq!(cli.http_port, 8080);
        assert_eq!(cli.rpc_port, 9194);
        assert_eq!(cli.http_timeout_sec, 86_400);
        assert_eq!(cli.metrics_port, 9153);
        assert_eq!(cli.limiter_limit, 10_000);
        assert!(!cli.metrics_enabled);
        assert!(cli.database_url.is_none());
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn limiter_flag_enables_rate_limit() {
        let cli = Cli::parse_from(["guestlist-server", "--limiter-enabled", "--limiter-limit", "50"]);
        let limit = cli.network_config().rate_limit.unwrap();
        assert_eq!(limit.per_second, 50);
        assert_eq!(limit.burst, 50);

        let cli = Cli::parse_from(["guestlist-server"]);
        assert!(cli.network_config().rate_limit.is_none());
    }

    #[test]
    fn rpc_config_uses_rpc_flags() {
        let cli = Cli::parse_from(["guestlist-server", "--rpc-port", "7000", "--rpc-timeout-sec", "5"]);
        let rpc = cli.rpc_config();
        assert_eq!(rpc.port, 7000);
        assert_eq!(rpc.idle_timeout, Duration::from_secs(5));
    }

    #[test]
    fn summary_masks_database_password() {
        let cli = Cli::parse_from([
            "guestlist-server",
            "--database-url",
            "postgres://guest:hunter2@db:5432/guestlist",
        ]);
        let summary = cli.summary().to_string();
        assert!(!summary.contains("hunter2"));
        assert!(summary.contains("******"));
        assert!(summary.contains("db:5432"));
    }

    #[test]
    fn json_log_format_parses() {
        let cli = Cli::parse_from(["guestlist-server", "--log-format", "json"]);
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}

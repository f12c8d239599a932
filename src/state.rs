use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::analysis::Analyzer;

/// Runtime pipeline parameters, read once at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub caching_enabled: bool,
    pub freeform_enabled: bool,
    pub cache_ttl: Duration,
    pub extract_timeout: Duration,
    pub request_deadline: Duration,
    pub max_source_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            caching_enabled: true,
            freeform_enabled: true,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            extract_timeout: Duration::from_secs(20),
            request_deadline: Duration::from_secs(90),
            max_source_chars: 15_000,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            caching_enabled: env_flag("CACHE_ENABLED", defaults.caching_enabled),
            freeform_enabled: env_flag("FREEFORM_ENABLED", defaults.freeform_enabled),
            cache_ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", defaults.cache_ttl.as_secs())),
            extract_timeout: Duration::from_secs(env_or(
                "EXTRACT_TIMEOUT_SECS",
                defaults.extract_timeout.as_secs(),
            )),
            request_deadline: Duration::from_secs(env_or(
                "REQUEST_DEADLINE_SECS",
                defaults.request_deadline.as_secs(),
            )),
            max_source_chars: env_or("MAX_SOURCE_CHARS", defaults.max_source_chars),
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match dotenv::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, default = %default, "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    match dotenv::var(name).map(|v| v.trim().to_ascii_lowercase()) {
        Ok(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Ok(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        Ok(v) => {
            warn!(var = name, value = %v, default, "Unrecognised flag, using default");
            default
        }
        Err(_) => default,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::auth::DEFAULT_SIGNIN_URL;
use crate::cache::SessionCache;
use crate::graphql::DEFAULT_GRAPHQL_URL;

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// GraphQL endpoint
    #[arg(long, global = true, env = "DASHBOARD_GRAPHQL_URL", default_value = DEFAULT_GRAPHQL_URL)]
    pub graphql_url: String,

    /// Sign-in endpoint (Basic auth, returns a bearer token)
    #[arg(long, global = true, env = "DASHBOARD_SIGNIN_URL", default_value = DEFAULT_SIGNIN_URL)]
    pub signin_url: String,

    /// Bearer token from a previous `login`
    #[arg(long, global = true, env = "DASHBOARD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Login or email, used to sign in when no token is given
    #[arg(long, global = true, env = "DASHBOARD_IDENTIFIER")]
    pub identifier: Option<String>,

    #[arg(long, global = true, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Where cached responses live between runs [default: the user cache dir]
    #[arg(long, global = true, env = "DASHBOARD_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Keep the cache in memory for this run only
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }
        if self.graphql_url.trim().is_empty() {
            return Err("DASHBOARD_GRAPHQL_URL must not be empty".to_string());
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `--cache-dir`, else `xp-dashboard` under the per-user cache directory
    /// (`$XDG_CACHE_HOME`, `~/Library/Caches`, `%LOCALAPPDATA%`).
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("xp-dashboard")
        })
    }

    pub fn open_cache(&self) -> SessionCache {
        if self.no_cache {
            SessionCache::in_memory()
        } else {
            SessionCache::on_disk(self.cache_dir())
        }
    }

    /// Identifier and password, when both were supplied.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.identifier.as_deref(), self.password.as_deref()) {
            (Some(identifier), Some(password)) if !identifier.is_empty() => {
                Some((identifier, password))
            }
            _ => None,
        }
    }
}

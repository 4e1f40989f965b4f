use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "parley.toml",
    "config/parley.toml",
    "crates/config/parley.toml",
    "../parley.toml",
    "../config/parley.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "DatabaseConfig::default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    const fn default_busy_timeout() -> u64 {
        5_000
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://parley.db".to_string(),
            max_connections: 10,
            busy_timeout_ms: Self::default_busy_timeout(),
        }
    }
}

/// Settings for verifying the bearer credentials handed out by the identity provider.
///
/// ```
/// use parley_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.issuer, "parley");
/// assert_eq!(auth.token_ttl_seconds, 86_400);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_issuer")]
    pub issuer: String,
    #[serde(default = "AuthConfig::default_audience")]
    pub audience: String,
    #[serde(default = "AuthConfig::default_token_ttl")]
    pub token_ttl_seconds: u64,
}

impl AuthConfig {
    fn default_issuer() -> String {
        "parley".to_string()
    }

    fn default_audience() -> String {
        "parley-clients".to_string()
    }

    const fn default_token_ttl() -> u64 {
        86_400
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "development_secret_change_in_production".to_string(),
            issuer: Self::default_issuer(),
            audience: Self::default_audience(),
            token_ttl_seconds: Self::default_token_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Capacity of each connection's outbound event queue.
    #[serde(default = "RealtimeConfig::default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl RealtimeConfig {
    const fn default_outbound_buffer() -> usize {
        256
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: Self::default_outbound_buffer(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use parley_config::load;
///
/// std::env::remove_var("PARLEY_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let token_ttl = i64::try_from(defaults.auth.token_ttl_seconds).unwrap_or(i64::MAX);
    let busy_timeout = i64::try_from(defaults.database.busy_timeout_ms).unwrap_or(i64::MAX);
    let outbound_buffer = i64::try_from(defaults.realtime.outbound_buffer).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("database.busy_timeout_ms", busy_timeout)?
        .set_default("auth.jwt_secret", defaults.auth.jwt_secret.clone())?
        .set_default("auth.issuer", defaults.auth.issuer.clone())?
        .set_default("auth.audience", defaults.auth.audience.clone())?
        .set_default("auth.token_ttl_seconds", token_ttl)?
        .set_default("realtime.outbound_buffer", outbound_buffer)?;

    let environment_overrides = config::Environment::with_prefix("PARLEY").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("PARLEY_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via PARLEY_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.token_ttl_seconds > i64::MAX as u64 {
        config.auth.token_ttl_seconds = i64::MAX as u64;
    }

    if config.realtime.outbound_buffer == 0 {
        config.realtime.outbound_buffer = 1;
    }

    debug!(
        http.address = %config.http.address,
        http.port = config.http.port,
        database.url = %config.database.url,
        "loaded backend configuration"
    );
    Ok(config)
}

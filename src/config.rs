use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub auth: AuthConfig,

    pub security: SecurityConfig,

    pub providers: ProvidersConfig,

    pub catalog: CatalogConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `sqlite:data/filmlog.db` or `sqlite::memory:`.
    /// Required: startup fails when empty.
    pub url: String,

    pub max_connections: u32,

    pub min_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign bearer tokens. Required.
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    /// Token validity window in days.
    pub token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// OMDb key. Without it external search and detail enrichment are disabled.
    #[serde(skip_serializing)]
    pub omdb_api_key: Option<String>,

    pub omdb_base_url: String,

    /// TMDB key. Without it the trending endpoint answers 503.
    #[serde(skip_serializing)]
    pub tmdb_api_key: Option<String>,

    pub tmdb_base_url: String,

    pub request_timeout_seconds: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            omdb_api_key: None,
            omdb_base_url: "https://www.omdbapi.com".to_string(),
            tmdb_api_key: None,
            tmdb_base_url: "https://api.themoviedb.org/3".to_string(),
            request_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub search_page_size: u64,

    pub popular_default_limit: u64,

    pub recommendation_limit: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_page_size: 10,
            popular_default_limit: 20,
            recommendation_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,

    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info,sqlx=warn".to_string(),
            metrics_enabled: true,
        }
    }
}

impl Config {
    /// Defaults, then the first config file found, then `.env` and the process environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file(None)?;
        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_with_path(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(Some(path))?;
        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn load_file(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults and environment");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Overlays environment variables on top of file/default values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = non_empty("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(key) = non_empty("OMDB_API_KEY") {
            self.providers.omdb_api_key = Some(key);
        }
        if let Some(key) = non_empty("TMDB_API_KEY") {
            self.providers.tmdb_api_key = Some(key);
        }
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port.parse().context("PORT must be a valid port number")?;
        }
        if let Some(level) = non_empty("LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(days) = non_empty("TOKEN_TTL_DAYS") {
            self.auth.token_ttl_days = days
                .parse()
                .context("TOKEN_TTL_DAYS must be a whole number of days")?;
        }

        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("filmlog").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".filmlog").join("config.toml"));
        }

        paths
    }

    /// Fails on missing required secrets; warns about optional provider keys.
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL is required (set it in the environment or config.toml)");
        }

        if self.auth.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET is required (set it in the environment or config.toml)");
        }

        if self.auth.token_ttl_days <= 0 {
            anyhow::bail!("auth.token_ttl_days must be > 0");
        }

        if self.catalog.search_page_size == 0 {
            anyhow::bail!("catalog.search_page_size must be > 0");
        }

        if self.providers.omdb_api_key.is_none() {
            warn!("OMDB_API_KEY not set: external film search and details are disabled");
        }

        if self.providers.tmdb_api_key.is_none() {
            warn!("TMDB_API_KEY not set: trending films are unavailable");
        }

        Ok(())
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.catalog.search_page_size, 10);
        assert_eq!(config.catalog.popular_default_limit, 20);
        assert!(config.providers.omdb_api_key.is_none());
    }

    #[test]
    fn test_missing_secrets_are_fatal() {
        let mut config = Config::default();
        assert!(config.validate().is_err());

        config.database.url = "sqlite::memory:".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        config.auth.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let vars = env(&[
            ("DATABASE_URL", "sqlite:data/test.db"),
            ("JWT_SECRET", "from-env"),
            ("OMDB_API_KEY", "abc123"),
            ("TMDB_API_KEY", "  "),
            ("PORT", "8081"),
        ]);

        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.database.url, "sqlite:data/test.db");
        assert_eq!(config.auth.jwt_secret, "from-env");
        assert_eq!(config.providers.omdb_api_key.as_deref(), Some("abc123"));
        assert!(config.providers.tmdb_api_key.is_none());
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let vars = env(&[("PORT", "not-a-port")]);
        let mut config = Config::default();
        assert!(config.apply_env(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [server]
            port = 9000

            [catalog]
            search_page_size = 25
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.catalog.search_page_size, 25);
        assert_eq!(config.auth.token_ttl_days, 7);
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = Config::default();
        config.auth.jwt_secret = "super-secret".to_string();
        config.providers.omdb_api_key = Some("omdb-secret".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("super-secret"));
        assert!(!toml_str.contains("omdb-secret"));
        assert!(toml_str.contains("[server]"));
    }
}

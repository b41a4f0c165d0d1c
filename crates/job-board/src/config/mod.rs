use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

pub const STORE_URL_VAR: &str = "BOARD_STORE_URL";
pub const STORE_KEY_VAR: &str = "BOARD_STORE_KEY";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Reads `.env` and the process environment. The store endpoint and key are required.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let store = StoreConfig::new(required(STORE_URL_VAR)?, required(STORE_KEY_VAR)?)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Backends the store URL can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
}

/// Hosted store endpoint plus the project key used to talk to it.
#[derive(Clone)]
pub struct StoreConfig {
    pub url: String,
    pub key: String,
    pub backend: StoreBackend,
}

impl StoreConfig {
    pub fn new(url: String, key: String) -> Result<Self, ConfigError> {
        let backend = match url.split_once("://") {
            Some((scheme, _)) if scheme.eq_ignore_ascii_case("memory") => StoreBackend::Memory,
            _ => return Err(ConfigError::UnsupportedStore(url)),
        };
        Ok(Self { url, key, backend })
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("backend", &self.backend)
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingVar(&'static str),
    UnsupportedStore(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingVar(name) => write!(f, "{} must be set", name),
            ConfigError::UnsupportedStore(url) => {
                write!(f, "unsupported store url '{}': expected memory://", url)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::MissingVar(_)
            | ConfigError::UnsupportedStore(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::set_var(STORE_URL_VAR, "memory://local");
        env::set_var(STORE_KEY_VAR, "test-project-key");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.key, "test-project-key");
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn missing_store_url_is_fatal() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::remove_var(STORE_URL_VAR);
        match AppConfig::load() {
            Err(ConfigError::MissingVar(name)) => assert_eq!(name, STORE_URL_VAR),
            other => panic!("expected missing store url, got {other:?}"),
        }
    }

    #[test]
    fn blank_store_key_counts_as_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(STORE_KEY_VAR, "   ");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingVar(STORE_KEY_VAR))
        ));
    }

    #[test]
    fn rejects_unknown_store_schemes() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var(STORE_URL_VAR, "https://db.example.com");
        let err = AppConfig::load().expect_err("https is not supported");
        assert_eq!(
            err.to_string(),
            "unsupported store url 'https://db.example.com': expected memory://"
        );
    }

    #[test]
    fn store_config_debug_hides_the_key() {
        let config = StoreConfig::new("memory://".to_string(), "secret".to_string())
            .expect("memory scheme");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
    }
}

use crate::ConfigError;
use std::{collections::HashMap, env};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub google: GoogleOAuthConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            google: GoogleOAuthConfig::from_env()?,
            auth: AuthConfig::from_env()?,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar { name })
}

fn parsed<T: std::str::FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        name,
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed(
                "SERVER_PORT",
                env::var("SERVER_PORT").unwrap_or_else(|_| "8000".to_string()),
            )?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: usize,
}

impl DatabaseConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: required("DATABASE_HOST")?,
            port: parsed("DATABASE_PORT", required("DATABASE_PORT")?)?,
            database: required("DATABASE_NAME")?,
            username: required("DATABASE_USERNAME")?,
            password: required("DATABASE_PASSWORD")?,
            max_connections: parsed(
                "DATABASE_MAX_CONNECTIONS",
                env::var("DATABASE_MAX_CONNECTIONS").unwrap_or_else(|_| "5".to_string()),
            )?,
        })
    }
}

/// Logging Configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub modules: HashMap<String, String>,
}

impl LoggingConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut modules = HashMap::new();

        // Load module-specific log levels
        if let Ok(level) = env::var("LOG_MODULE_API") {
            modules.insert("api".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_SERVICES") {
            modules.insert("services".to_string(), level);
        }
        if let Ok(level) = env::var("LOG_MODULE_DATABASE") {
            modules.insert("database".to_string(), level);
        }

        Ok(Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            modules,
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            modules: HashMap::new(),
        }
    }
}

/// Google OAuth provider configuration.
///
/// Endpoint URLs default to the public Google endpoints and are only
/// overridden in tests.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub tokeninfo_url: String,
}

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_TOKENINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/tokeninfo";

impl GoogleOAuthConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: required("GOOGLE_CLIENT_ID")?,
            client_secret: required("GOOGLE_CLIENT_SECRET")?,
            redirect_uri: required("GOOGLE_REDIRECT_URI")?,
            auth_url: env::var("GOOGLE_AUTH_URL").unwrap_or_else(|_| GOOGLE_AUTH_URL.to_string()),
            token_url: env::var("GOOGLE_TOKEN_URL")
                .unwrap_or_else(|_| GOOGLE_TOKEN_URL.to_string()),
            tokeninfo_url: env::var("GOOGLE_TOKENINFO_URL")
                .unwrap_or_else(|_| GOOGLE_TOKENINFO_URL.to_string()),
        })
    }
}

/// How the refresh token travels between server and client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshTokenTransport {
    /// HttpOnly cookie, rotated on refresh
    #[default]
    Cookie,
    /// JSON response body; the client presents it back in the request body
    Body,
}

impl std::str::FromStr for RefreshTokenTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "body" => Ok(Self::Body),
            other => Err(format!("expected 'cookie' or 'body', got '{other}'")),
        }
    }
}

/// Authentication flow configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Use in-memory repositories and a canned provider (development only)
    pub mock: bool,
    pub state_cookie: String,
    pub refresh_cookie: String,
    pub refresh_transport: RefreshTokenTransport,
    pub state_entropy_bytes: usize,
}

impl AuthConfig {
    /// Load from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            mock: env::var("AUTH_MOCK")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            state_cookie: env::var("AUTH_STATE_COOKIE")
                .unwrap_or_else(|_| "oauth_state".to_string()),
            refresh_cookie: env::var("AUTH_REFRESH_COOKIE")
                .unwrap_or_else(|_| "refresh_token".to_string()),
            refresh_transport: parsed(
                "AUTH_REFRESH_TRANSPORT",
                env::var("AUTH_REFRESH_TRANSPORT").unwrap_or_else(|_| "cookie".to_string()),
            )?,
            state_entropy_bytes: parsed(
                "AUTH_STATE_ENTROPY_BYTES",
                env::var("AUTH_STATE_ENTROPY_BYTES").unwrap_or_else(|_| "1024".to_string()),
            )?,
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mock: false,
            state_cookie: "oauth_state".to_string(),
            refresh_cookie: "refresh_token".to_string(),
            refresh_transport: RefreshTokenTransport::Cookie,
            state_entropy_bytes: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_transport_parsing() {
        assert_eq!(
            "cookie".parse::<RefreshTokenTransport>().unwrap(),
            RefreshTokenTransport::Cookie
        );
        assert_eq!(
            "Body".parse::<RefreshTokenTransport>().unwrap(),
            RefreshTokenTransport::Body
        );
        assert!("header".parse::<RefreshTokenTransport>().is_err());
    }

    #[test]
    fn test_auth_config_defaults() {
        let config = AuthConfig::default();

        assert_eq!(config.state_cookie, "oauth_state");
        assert_eq!(config.refresh_cookie, "refresh_token");
        assert_eq!(config.refresh_transport, RefreshTokenTransport::Cookie);
        assert_eq!(config.state_entropy_bytes, 1024);
        assert!(!config.mock);
    }

    #[test]
    fn test_server_bind_address() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        };

        assert_eq!(server.bind_address(), "127.0.0.1:8000");
    }
}

//! Portal settings, read from the process environment (and `.env`).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::models::OAuthProvider;

/// Path the local listener serves for the provider redirect.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// Local-stack defaults, rejected when RUST_ENV=production.
pub mod defaults {
    pub const DEV_SUPABASE_URL: &str = "http://127.0.0.1:54321";
    pub const DEV_ANON_KEY: &str = "dev-anon-key-do-not-use-in-production";
    pub const DEV_OAUTH_PROVIDER: &str = "discord";
    pub const DEV_CALLBACK_HOST: &str = "127.0.0.1";
    pub const DEV_CALLBACK_PORT: u16 = 8765;
    pub const DEV_SESSION_FILE: &str = ".league/session.json";
    pub const DEV_HTTP_TIMEOUT_SECS: u64 = 10;
    pub const DEV_REFRESH_MARGIN_SECS: u64 = 60; // refresh when the token expires within a minute
    pub const DEV_REFRESH_INTERVAL_SECS: u64 = 30;
}

/// Deployment mode: decides whether local-stack defaults are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Accepts the long and short spellings, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Hosted backend connection settings.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Project URL; `/rest/v1` and `/auth/v1` are appended
    pub url: String,
    /// Public anon key sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Total timeout for a single remote call
    pub http_timeout: Duration,
}

impl BackendSettings {
    /// Base URL of the tabular store.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url.trim_end_matches('/'))
    }

    /// Base URL of the identity provider.
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url.trim_end_matches('/'))
    }
}

/// Sign-in settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// External provider used by `league login`
    pub provider: OAuthProvider,
    /// Host the local callback listener binds to
    pub callback_host: String,
    /// Port the local callback listener binds to
    pub callback_port: u16,
    /// Where the signed-in session is persisted between runs
    pub session_file: PathBuf,
    /// Refresh the access token when it expires within this window
    pub refresh_margin: Duration,
    /// How often the refresh task checks the session
    pub refresh_interval: Duration,
}

impl AuthSettings {
    /// Redirect URL handed to the provider.
    pub fn redirect_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.callback_host, self.callback_port, CALLBACK_PATH
        )
    }
}

/// Everything the client needs to reach the backend and sign in.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Hosted backend
    pub backend: BackendSettings,
    /// Sign-in flow
    pub auth: AuthSettings,
}

impl Config {
    /// Read settings from the environment.
    ///
    /// In development mode (RUST_ENV=development) every variable has a
    /// local default. In production mode the backend URL and anon key must
    /// be set and must not match the development defaults.
    ///
    /// Variables:
    /// - `RUST_ENV`: `development` or `production` (required)
    /// - `LEAGUE_SUPABASE_URL`: Hosted backend project URL
    /// - `LEAGUE_SUPABASE_ANON_KEY`: Public anon key
    /// - `LEAGUE_OAUTH_PROVIDER`: Sign-in provider (default: discord)
    /// - `LEAGUE_CALLBACK_HOST`: Callback listener host (default: 127.0.0.1)
    /// - `LEAGUE_CALLBACK_PORT`: Callback listener port (default: 8765)
    /// - `LEAGUE_SESSION_FILE`: Persisted session path (default: .league/session.json)
    /// - `LEAGUE_HTTP_TIMEOUT_SECS`: Remote call timeout (default: 10)
    /// - `LEAGUE_REFRESH_MARGIN_SECS`: Token refresh margin (default: 60)
    /// - `LEAGUE_REFRESH_INTERVAL_SECS`: Refresh check interval (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let url = env::var("LEAGUE_SUPABASE_URL")
            .unwrap_or_else(|_| defaults::DEV_SUPABASE_URL.to_string());

        let anon_key = env::var("LEAGUE_SUPABASE_ANON_KEY")
            .unwrap_or_else(|_| defaults::DEV_ANON_KEY.to_string());

        let provider_str = env::var("LEAGUE_OAUTH_PROVIDER")
            .unwrap_or_else(|_| defaults::DEV_OAUTH_PROVIDER.to_string());
        let provider = OAuthProvider::parse(&provider_str).ok_or(ConfigError::InvalidValue(
            "LEAGUE_OAUTH_PROVIDER must be 'discord' or 'github'",
        ))?;

        let callback_host = env::var("LEAGUE_CALLBACK_HOST")
            .unwrap_or_else(|_| defaults::DEV_CALLBACK_HOST.to_string());

        let callback_port = env::var("LEAGUE_CALLBACK_PORT")
            .unwrap_or_else(|_| defaults::DEV_CALLBACK_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("LEAGUE_CALLBACK_PORT must be a valid port number")
            })?;

        let session_file = env::var("LEAGUE_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DEV_SESSION_FILE));

        let http_timeout_secs = parse_secs(
            "LEAGUE_HTTP_TIMEOUT_SECS",
            defaults::DEV_HTTP_TIMEOUT_SECS,
            "LEAGUE_HTTP_TIMEOUT_SECS must be a valid number",
        )?;
        let refresh_margin_secs = parse_secs(
            "LEAGUE_REFRESH_MARGIN_SECS",
            defaults::DEV_REFRESH_MARGIN_SECS,
            "LEAGUE_REFRESH_MARGIN_SECS must be a valid number",
        )?;
        let refresh_interval_secs = parse_secs(
            "LEAGUE_REFRESH_INTERVAL_SECS",
            defaults::DEV_REFRESH_INTERVAL_SECS,
            "LEAGUE_REFRESH_INTERVAL_SECS must be a valid number",
        )?;

        let config = Config {
            environment,
            backend: BackendSettings {
                url,
                anon_key: SecretString::from(anon_key),
                http_timeout: Duration::from_secs(http_timeout_secs),
            },
            auth: AuthSettings {
                provider,
                callback_host,
                callback_port,
                session_file,
                refresh_margin: Duration::from_secs(refresh_margin_secs),
                refresh_interval: Duration::from_secs(refresh_interval_secs),
            },
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Production must point at a real project, not the local stack.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.backend.url == defaults::DEV_SUPABASE_URL {
            errors.push(format!(
                "LEAGUE_SUPABASE_URL is using development default '{}'. Set the hosted project URL.",
                defaults::DEV_SUPABASE_URL
            ));
        }

        if self.backend.anon_key.expose_secret() == defaults::DEV_ANON_KEY {
            errors.push(
                "LEAGUE_SUPABASE_ANON_KEY is using development default. Set the project anon key."
                    .to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// True when local-stack defaults are in effect.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

fn parse_secs(var: &str, default: u64, message: &'static str) -> Result<u64, ConfigError> {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidValue(message))
}

/// Why the environment could not be turned into a `Config`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}

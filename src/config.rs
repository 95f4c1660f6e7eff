//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 4001;
    pub const DEV_CLIENT_URL: &str = "http://localhost:4001";

    pub const DEV_HASURA_URL: &str = "http://localhost:8080/v1/graphql";
    pub const DEV_HASURA_ADMIN_SECRET: &str = "dev-hasura-secret-do-not-use-in-production";

    pub const DEV_JWT_SECRET: &str = "dev-jwt-secret-do-not-use-in-production";
    pub const ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60; // 15 minutes
    pub const REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60; // 7 days
    pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60; // 10 years

    // MinIO defaults for development; production talks to Cloudflare R2
    pub const DEV_S3_ENDPOINT: &str = "http://localhost:9100";
    pub const DEV_S3_BUCKET: &str = "avatars";
    pub const DEV_S3_ACCESS_KEY: &str = "minioadmin";
    pub const DEV_S3_SECRET_KEY: &str = "minioadmin";
    pub const DEV_S3_PUBLIC_URL: &str = "http://localhost:9100/avatars";
    pub const S3_REGION: &str = "auto";
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
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

/// GraphQL (Hasura) endpoint configuration.
#[derive(Debug, Clone)]
pub struct GraphqlSettings {
    /// GraphQL endpoint URL
    pub url: String,
    /// Value sent as `x-hasura-admin-secret`
    pub admin_secret: SecretString,
    /// Role sent as `x-hasura-role` when a request does not name one
    pub default_role: Option<String>,
}

/// Session token configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// HS256 signing secret for access tokens
    pub jwt_secret: SecretString,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: u64,
    /// Mark cookies `Secure`
    pub secure_cookies: bool,
}

/// Object storage configuration (Cloudflare R2 or any S3-compatible service).
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// S3 endpoint URL
    pub endpoint: Option<String>,
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: SecretString,
    /// Public base URL that uploaded objects are served from
    pub public_url: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Directory for the prebuilt frontend bundle
    pub static_dir: Option<PathBuf>,
    /// Base URL of the client application, used to build reset links
    pub client_url: String,
    pub graphql: GraphqlSettings,
    pub session: SessionSettings,
    pub storage: StorageSettings,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode every variable has a default and only `RUST_ENV` is required.
    /// In production the server refuses to start while any secret still equals its
    /// development default.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `APP_HOST`, `APP_PORT`: bind address (default: 127.0.0.1:4001)
    /// - `STATIC_DIR`: frontend bundle directory
    /// - `CLIENT_URL`: client application URL (default: http://localhost:4001)
    /// - `HASURA_URL`, `HASURA_ADMIN_SECRET`, `HASURA_DEFAULT_ROLE`
    /// - `JWT_SECRET`, `ACCESS_TOKEN_TTL_SECS`, `REFRESH_TOKEN_TTL_SECS`
    /// - `CLOUDFLARE_R2_ACCOUNT_ID`, `CLOUDFLARE_R2_ACCESS_KEY_ID`,
    ///   `CLOUDFLARE_R2_SECRET_ACCESS_KEY`, `CLOUDFLARE_R2_BUCKET_NAME`,
    ///   `CLOUDFLARE_R2_PUBLIC_URL`
    /// - `S3_ENDPOINT`: explicit endpoint, overrides the one derived from the R2 account id
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("APP_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("APP_PORT must be a valid port number"))?;

        let static_dir = env::var("STATIC_DIR").ok().map(PathBuf::from);

        let client_url =
            env::var("CLIENT_URL").unwrap_or_else(|_| defaults::DEV_CLIENT_URL.to_string());

        let graphql = GraphqlSettings {
            url: env::var("HASURA_URL").unwrap_or_else(|_| defaults::DEV_HASURA_URL.to_string()),
            admin_secret: SecretString::from(
                env::var("HASURA_ADMIN_SECRET")
                    .unwrap_or_else(|_| defaults::DEV_HASURA_ADMIN_SECRET.to_string()),
            ),
            default_role: env::var("HASURA_DEFAULT_ROLE")
                .ok()
                .filter(|r| !r.trim().is_empty()),
        };

        let access_token_ttl_secs = parse_ttl(
            env::var("ACCESS_TOKEN_TTL_SECS").ok(),
            defaults::ACCESS_TOKEN_TTL_SECS,
        )
        .ok_or(ConfigError::InvalidValue(
            "ACCESS_TOKEN_TTL_SECS must be a number of seconds, at most ten years",
        ))?;

        let refresh_token_ttl_secs = parse_ttl(
            env::var("REFRESH_TOKEN_TTL_SECS").ok(),
            defaults::REFRESH_TOKEN_TTL_SECS,
        )
        .ok_or(ConfigError::InvalidValue(
            "REFRESH_TOKEN_TTL_SECS must be a number of seconds, at most ten years",
        ))?;

        let session = SessionSettings {
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET").unwrap_or_else(|_| defaults::DEV_JWT_SECRET.to_string()),
            ),
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            secure_cookies: environment.is_production(),
        };

        let storage = storage_from_env(environment);

        let config = Config {
            environment,
            host,
            port,
            static_dir,
            client_url,
            graphql,
            session,
            storage,
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.graphql.admin_secret.expose_secret() == defaults::DEV_HASURA_ADMIN_SECRET {
            errors.push(
                "HASURA_ADMIN_SECRET is using development default. Set the Hasura admin secret."
                    .to_string(),
            );
        }

        if self.session.jwt_secret.expose_secret() == defaults::DEV_JWT_SECRET {
            errors.push(
                "JWT_SECRET is using development default. Set a long random signing secret."
                    .to_string(),
            );
        }

        if self.storage.access_key == defaults::DEV_S3_ACCESS_KEY
            || self.storage.secret_key.expose_secret() == defaults::DEV_S3_SECRET_KEY
        {
            errors.push(
                "CLOUDFLARE_R2_ACCESS_KEY_ID/CLOUDFLARE_R2_SECRET_ACCESS_KEY are using development defaults."
                    .to_string(),
            );
        }

        if self.storage.public_url == defaults::DEV_S3_PUBLIC_URL {
            errors.push(
                "CLOUDFLARE_R2_PUBLIC_URL is not set. Set the public URL avatars are served from."
                    .to_string(),
            );
        }

        if self.session.access_token_ttl_secs == 0 || self.session.refresh_token_ttl_secs == 0 {
            errors.push("Token lifetimes must be greater than zero".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

/// Parse a token lifetime, falling back to `default` when unset.
fn parse_ttl(raw: Option<String>, default: u64) -> Option<u64> {
    let secs = match raw {
        Some(value) => value.trim().parse::<u64>().ok()?,
        None => default,
    };
    (secs <= defaults::MAX_TOKEN_TTL_SECS).then_some(secs)
}

fn storage_from_env(environment: Environment) -> StorageSettings {
    let account_id = env::var("CLOUDFLARE_R2_ACCOUNT_ID").ok();

    let endpoint = env::var("S3_ENDPOINT")
        .ok()
        .or_else(|| r2_endpoint(account_id.as_deref()))
        .or_else(|| {
            if environment.is_development() {
                Some(defaults::DEV_S3_ENDPOINT.to_string())
            } else {
                None
            }
        });

    StorageSettings {
        endpoint,
        bucket: env::var("CLOUDFLARE_R2_BUCKET_NAME")
            .unwrap_or_else(|_| defaults::DEV_S3_BUCKET.to_string()),
        region: defaults::S3_REGION.to_string(),
        access_key: env::var("CLOUDFLARE_R2_ACCESS_KEY_ID")
            .unwrap_or_else(|_| defaults::DEV_S3_ACCESS_KEY.to_string()),
        secret_key: SecretString::from(
            env::var("CLOUDFLARE_R2_SECRET_ACCESS_KEY")
                .unwrap_or_else(|_| defaults::DEV_S3_SECRET_KEY.to_string()),
        ),
        public_url: env::var("CLOUDFLARE_R2_PUBLIC_URL")
            .unwrap_or_else(|_| defaults::DEV_S3_PUBLIC_URL.to_string()),
    }
}

/// Build the R2 endpoint for an account id.
fn r2_endpoint(account_id: Option<&str>) -> Option<String> {
    account_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| format!("https://{}.r2.cloudflarestorage.com", id))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}

/// Configuration management for the API server
///
/// Configuration is read from environment variables; a `.env` file is loaded
/// first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS and strict headers (default: false)
/// - `JWT_SECRET`: Secret key for JWT signing (required, >= 32 chars)
/// - `APP_NAME`: Name used in mail copy (default: TeamPulse)
/// - `APP_URL`: Public base URL used in invitation links (default: http://localhost:8080)
/// - `INVITATION_TTL_HOURS`: Invitation lifetime (default: 24)
/// - `MAIL_FROM`: Sender address (default: TeamPulse <no-reply@teampulse.local>)
/// - `MAIL_API_URL` / `MAIL_API_KEY`: HTTP mail API; mails are only logged when unset
/// - `RUST_LOG`: Log filter (default: teampulse_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use teampulse_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use teampulse_shared::models::invitation::DEFAULT_INVITATION_TTL_HOURS;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    pub app: AppConfig,

    pub mail: MailConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS, strict CSP)
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Public application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,

    /// Base URL for links in outgoing mail
    pub url: String,

    pub invitation_ttl_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from: String,

    pub api_url: Option<String>,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e))
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Splits a comma-separated origin list, ignoring blanks
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric or boolean variable cannot be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let invitation_ttl_hours: i64 =
            parse_var("INVITATION_TTL_HOURS", &DEFAULT_INVITATION_TTL_HOURS.to_string())?;
        if invitation_ttl_hours <= 0 {
            anyhow::bail!("INVITATION_TTL_HOURS must be positive");
        }

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("API_PORT", "8080")?,
                cors_origins: parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string())),
                production: parse_var("PRODUCTION", "false")?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            app: AppConfig {
                name: env::var("APP_NAME").unwrap_or_else(|_| "TeamPulse".to_string()),
                url: env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
                invitation_ttl_hours,
            },
            mail: MailConfig {
                from: env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "TeamPulse <no-reply@teampulse.local>".to_string()),
                api_url: optional_var("MAIL_API_URL"),
                api_key: optional_var("MAIL_API_KEY"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn invitation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.app.invitation_ttl_hours)
    }

    /// A configuration suitable for tests: permissive CORS, log mailer
    pub fn for_tests(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: database_url.into(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: jwt_secret.into(),
            },
            app: AppConfig {
                name: "TeamPulse".to_string(),
                url: "http://localhost:8080".to_string(),
                invitation_ttl_hours: DEFAULT_INVITATION_TTL_HOURS,
            },
            mail: MailConfig {
                from: "TeamPulse <no-reply@teampulse.local>".to_string(),
                api_url: None,
                api_key: None,
            },
        }
    }
}

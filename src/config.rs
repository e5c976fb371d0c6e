use thiserror::Error;

// Ten years.
const MAX_JWT_EXPIRY_HOURS: i64 = 24 * 365 * 10;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// When absent the server keeps its data in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub bcrypt_cost: u32,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    pub admin_invite_token: Option<String>,
    pub upload_dir: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error(transparent)]
    Source(#[from] config::ConfigError),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("environment", "development")?
            .set_default("server_port", "8080")?
            .set_default("jwt_expiry_hours", "168")?
            .set_default("bcrypt_cost", bcrypt::DEFAULT_COST.to_string())?
            .set_default("upload_dir", "uploads")?
            .set_default(
                "cors_allowed_origins",
                "http://localhost:5173,http://localhost:3000",
            )?
            .add_source(config::Environment::default())
            .build()?;

        Self::from_settings(&settings)
    }

    fn from_settings(settings: &config::Config) -> Result<Self, ConfigError> {
        let database_url = settings
            .get_string("database_url")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let jwt_secret = settings
            .get_string("jwt_secret")
            .map_err(|_| ConfigError::MissingVariable("JWT_SECRET".to_string()))?;

        let port = settings
            .get_string("server_port")?
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidFormat("SERVER_PORT must be a valid port number".to_string())
            })?;

        let jwt_expiry_hours = settings
            .get_string("jwt_expiry_hours")?
            .parse::<i64>()
            .ok()
            .filter(|hours| (1..=MAX_JWT_EXPIRY_HOURS).contains(hours))
            .ok_or_else(|| {
                ConfigError::InvalidFormat(format!(
                    "JWT_EXPIRY_HOURS must be between 1 and {MAX_JWT_EXPIRY_HOURS}"
                ))
            })?;

        let bcrypt_cost = settings
            .get_string("bcrypt_cost")?
            .parse::<u32>()
            .ok()
            .filter(|cost| (4..=31).contains(cost))
            .ok_or_else(|| {
                ConfigError::InvalidFormat("BCRYPT_COST must be between 4 and 31".to_string())
            })?;

        // Parse allowed origins
        let frontend_urls = settings
            .get_string("cors_allowed_origins")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let admin_invite_token = settings
            .get_string("admin_invite_token")
            .ok()
            .filter(|token| !token.is_empty());

        Ok(AppConfig {
            database_url,
            port,
            jwt_secret,
            jwt_expiry_hours,
            bcrypt_cost,
            environment: settings.get_string("environment")?,
            frontend_urls,
            admin_invite_token,
            upload_dir: settings.get_string("upload_dir")?,
        })
    }

    /// Configuration for tests: in-memory store, cheap hashing.
    pub fn for_tests() -> Self {
        AppConfig {
            database_url: None,
            port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            bcrypt_cost: 4,
            environment: "test".to_string(),
            frontend_urls: vec!["http://localhost:5173".to_string()],
            admin_invite_token: Some("let-me-admin".to_string()),
            upload_dir: "uploads".to_string(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

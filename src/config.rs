use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    pub whatsapp: WhatsAppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expires_in")]
    /// Lifetime of tokens minted with `JwtService::generate_access_token`, in seconds.
    pub access_token_expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// Empty means any origin is accepted.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Credentials and behaviour of the WhatsApp Cloud API gateway. Fixed once the
/// gateway is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub access_token: String,
    /// Provider-assigned id of the sending number (not the recipient).
    pub phone_number_id: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_verification_template")]
    pub verification_template: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Substituted when a user has no stored number. Leave unset in production
    /// unless every unregistered user really should reach this number.
    #[serde(default)]
    pub default_phone_number: Option<String>,
    /// 0 disables expiry.
    #[serde(default = "default_code_ttl_secs")]
    pub verification_code_ttl_secs: u64,
    #[serde(default)]
    pub require_verified_for_text: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_access_token_expires_in() -> i64 {
    7200
}

fn default_api_version() -> String {
    "v21.0".to_string()
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_verification_template() -> String {
    "verification_code".to_string()
}

fn default_language() -> String {
    "en_US".to_string()
}

fn default_code_ttl_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    1
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            api_version: default_api_version(),
            api_base_url: default_api_base_url(),
            verification_template: default_verification_template(),
            default_language: default_language(),
            default_phone_number: None,
            verification_code_ttl_secs: default_code_ttl_secs(),
            require_verified_for_text: false,
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

impl WhatsAppConfig {
    /// `{base}/{version}/{phone_number_id}/messages`
    pub fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.api_base_url.trim_end_matches('/'),
            self.api_version,
            self.phone_number_id
        )
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.access_token.trim().is_empty() {
            return Err(AppError::ConfigError(
                "whatsapp.access_token must be set".to_string(),
            ));
        }
        if self.phone_number_id.trim().is_empty() {
            return Err(AppError::ConfigError(
                "whatsapp.phone_number_id must be set".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::ConfigError(
                "whatsapp.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("Failed to parse {config_path}: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No file: build entirely from environment variables and defaults
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse(
                            "JWT_ACCESS_EXPIRES_IN",
                            default_access_token_expires_in(),
                        ),
                    },
                    cors: CorsConfig::default(),
                    whatsapp: WhatsAppConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Cannot read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        config.whatsapp.validate()?;

        Ok(config)
    }

    /// Environment variables win over file values.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get_env("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Some(v) = get_env("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Some(v) = get_env("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }
        if let Some(v) = get_env("CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        let wa = &mut self.whatsapp;
        if let Some(v) = get_env("WHATSAPP_ACCESS_TOKEN") {
            wa.access_token = v;
        }
        if let Some(v) = get_env("WHATSAPP_PHONE_NUMBER_ID") {
            wa.phone_number_id = v;
        }
        if let Some(v) = get_env("WHATSAPP_API_VERSION") {
            wa.api_version = v;
        }
        if let Some(v) = get_env("WHATSAPP_API_BASE_URL") {
            wa.api_base_url = v;
        }
        if let Some(v) = get_env("WHATSAPP_VERIFICATION_TEMPLATE") {
            wa.verification_template = v;
        }
        if let Some(v) = get_env("WHATSAPP_DEFAULT_LANGUAGE") {
            wa.default_language = v;
        }
        if let Some(v) = get_env("WHATSAPP_DEFAULT_PHONE_NUMBER") {
            wa.default_phone_number = if v.trim().is_empty() { None } else { Some(v) };
        }
        if let Some(v) = get_env("WHATSAPP_CODE_TTL_SECS")
            && let Ok(n) = v.parse()
        {
            wa.verification_code_ttl_secs = n;
        }
        if let Some(v) = get_env("WHATSAPP_REQUIRE_VERIFIED_FOR_TEXT")
            && let Ok(b) = v.parse()
        {
            wa.require_verified_for_text = b;
        }
        if let Some(v) = get_env("WHATSAPP_REQUEST_TIMEOUT_SECS")
            && let Ok(n) = v.parse()
        {
            wa.request_timeout_secs = n;
        }
        if let Some(v) = get_env("WHATSAPP_RETRY_MAX_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            wa.retry.max_attempts = n;
        }
        if let Some(v) = get_env("WHATSAPP_RETRY_INITIAL_BACKOFF_MS")
            && let Ok(n) = v.parse()
        {
            wa.retry.initial_backoff_ms = n;
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

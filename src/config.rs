use crate::error::{Error, Result};
use crate::services::quiz_service::QuizSettings;
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub provider_timeout_secs: u64,
    pub store_timeout_secs: u64,
    pub cache_timeout_ms: u64,
    pub request_timeout_secs: u64,
    pub quiz_cache_ttl_secs: u64,
    pub quiz_reuse_window_hours: i64,
    pub quiz_lifetime_hours: i64,
    pub quiz_fallback_enabled: bool,
    pub public_rps: u32,
    pub log_json: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8080".to_string())?,
            database_url: get_env_opt("DATABASE_URL"),
            jwt_secret: get_env("JWT_SECRET")?,
            openai_api_key: get_env_opt("OPENAI_API_KEY"),
            anthropic_api_key: get_env_opt("ANTHROPIC_API_KEY"),
            gemini_api_key: get_env_opt("GEMINI_API_KEY"),
            provider_timeout_secs: get_env_or("PROVIDER_TIMEOUT_SECS", 60)?,
            store_timeout_secs: get_env_or("STORE_TIMEOUT_SECS", 10)?,
            cache_timeout_ms: get_env_or("CACHE_TIMEOUT_MS", 500)?,
            request_timeout_secs: get_env_or("REQUEST_TIMEOUT_SECS", 120)?,
            quiz_cache_ttl_secs: get_env_or("QUIZ_CACHE_TTL_SECS", 3600)?,
            quiz_reuse_window_hours: get_env_or("QUIZ_REUSE_WINDOW_HOURS", 24)?,
            quiz_lifetime_hours: get_env_or("QUIZ_LIFETIME_HOURS", 24)?,
            quiz_fallback_enabled: get_env_or("QUIZ_FALLBACK_ENABLED", false)?,
            public_rps: get_env_or("PUBLIC_RPS", 20)?,
            log_json: get_env_opt("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    pub fn quiz_settings(&self) -> QuizSettings {
        QuizSettings {
            reuse_window: chrono::Duration::hours(self.quiz_reuse_window_hours),
            quiz_lifetime: chrono::Duration::hours(self.quiz_lifetime_hours),
            cache_ttl: Duration::from_secs(self.quiz_cache_ttl_secs),
            cache_timeout: Duration::from_millis(self.cache_timeout_ms),
            fallback_enabled: self.quiz_fallback_enabled,
            ..QuizSettings::default()
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

// core/src/config.rs
use crate::error::EngineError;

/// Process configuration, loaded once at startup from the environment
/// (with `.env` as a dev-time convenience, never consulted in prod).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub queue_url: Option<String>,
    pub secret_key: String,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            EngineError::Validation("DATABASE_URL must be set".into())
        })?;

        let queue_url = std::env::var("QUEUE_URL").ok();

        let secret_key = std::env::var("SECRET_KEY")
            .unwrap_or_else(|_| "dev-secret-key-do-not-use-in-prod".to_string());

        let debug = std::env::var("DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            queue_url,
            secret_key,
            debug,
        })
    }
}

use crate::error::{Error, Result};
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub payment_api_base: String,
    pub payment_api_key: String,
    pub payment_webhook_secret: String,
    pub email_api_base: String,
    pub email_api_key: String,
    pub email_from: String,
    pub app_url: String,
    pub learner_rps: u32,
    pub admin_rps: u32,
    pub verify_requests_per_minute: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            payment_api_base: env::var("PAYMENT_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            payment_api_key: get_env("PAYMENT_API_KEY")?,
            payment_webhook_secret: get_env("PAYMENT_WEBHOOK_SECRET")?,
            email_api_base: env::var("EMAIL_API_BASE")
                .unwrap_or_else(|_| "https://api.resend.com".to_string()),
            email_api_key: get_env("EMAIL_API_KEY")?,
            email_from: get_env("EMAIL_FROM")?,
            app_url: get_env("APP_URL")?,
            learner_rps: get_env_parse("LEARNER_RPS")?,
            admin_rps: get_env_parse("ADMIN_RPS")?,
            verify_requests_per_minute: env::var("VERIFY_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
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

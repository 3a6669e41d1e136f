use std::fmt::Debug;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::HeaderValue;
use secrecy::SecretString;

fn get_env<T: FromStr>(key: &str) -> T
where
    T::Err: Debug,
{
    std::env::var(key)
        .unwrap_or_else(|_| panic!("{key} must be set"))
        .parse()
        .unwrap_or_else(|e| panic!("{key} is invalid: {e:?}"))
}

fn get_env_default<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: Debug,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|e| panic!("{key} is invalid: {e:?}")),
        Err(_) => default,
    }
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    pub database_url: String,
    pub polar_api_base: String,
    pub polar_api_key: SecretString,
    pub polar_webhook_secret: SecretString,
    pub transcript_api_base: String,
    pub assistant_api_base: String,
    pub assistant_api_key: SecretString,
    pub assistant_model: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let database_url: String = get_env("DATABASE_URL");

        let polar_api_base: String =
            get_env_default("POLAR_API_BASE", "https://api.polar.sh".to_string());
        let polar_api_key = SecretString::new(get_env::<String>("POLAR_API_KEY").into());
        let polar_webhook_secret =
            SecretString::new(get_env::<String>("POLAR_WEBHOOK_SECRET").into());

        let transcript_api_base: String = get_env("TRANSCRIPT_API_BASE");

        let assistant_api_base: String =
            get_env_default("ASSISTANT_API_BASE", "https://api.openai.com".to_string());
        let assistant_api_key = SecretString::new(get_env::<String>("ASSISTANT_API_KEY").into());
        let assistant_model: String =
            get_env_default("ASSISTANT_MODEL", "gpt-4o-mini".to_string());

        Self {
            bind_addr,
            cors_origin,
            database_url,
            polar_api_base,
            polar_api_key,
            polar_webhook_secret,
            transcript_api_base,
            assistant_api_base,
            assistant_api_key,
            assistant_model,
        }
    }
}

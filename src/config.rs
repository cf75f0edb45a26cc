use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use axum::http::HeaderValue;
use crate::error::{AppError, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_DAILY_SUMMARY_LIMIT: u32 = 10;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub supabase_url: String,
    pub supabase_key: String,
    pub frontend_origin: HeaderValue,
    pub daily_summary_limit: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let openai_api_key = first_var(&["OPENAI_API_KEY", "OPENAI_KEY"])?;
        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());
        let openai_model = env::var("OPENAI_MODEL")
            .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string());

        let supabase_url = first_var(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])?;
        let supabase_key = env::var("SUPABASE_SERVICE_ROLE_KEY")?;

        let frontend_origin = env::var("FRONTEND_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let frontend_origin = parse_origin(&frontend_origin)?;

        let daily_summary_limit = match env::var("DAILY_SUMMARY_LIMIT") {
            Ok(raw) => parse_limit(&raw)?,
            Err(_) => DEFAULT_DAILY_SUMMARY_LIMIT,
        };

        // Load server configuration with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let server_addr = parse_addr(&host, &port)?;

        Ok(Config {
            server_addr,
            openai_api_key,
            openai_base_url: trim_base(openai_base_url),
            openai_model,
            supabase_url: trim_base(supabase_url),
            supabase_key,
            frontend_origin,
            daily_summary_limit,
        })
    }
}

/// Returns the value of the first variable in `names` that is set and non-empty.
fn first_var(names: &[&str]) -> Result<String> {
    names
        .iter()
        .find_map(|name| env::var(name).ok().filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| AppError::ConfigError(format!("{} must be set", names.join(" or "))))
}

fn parse_addr(host: &str, port: &str) -> Result<SocketAddr> {
    let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
    let ip = IpAddr::from_str(host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
    Ok(SocketAddr::new(ip, port))
}

fn parse_limit(raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| AppError::ConfigError(format!("Invalid DAILY_SUMMARY_LIMIT: {}", e)))
}

fn parse_origin(raw: &str) -> Result<HeaderValue> {
    raw.trim()
        .trim_end_matches('/')
        .parse::<HeaderValue>()
        .map_err(|e| AppError::ConfigError(format!("Invalid FRONTEND_ORIGIN: {}", e)))
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

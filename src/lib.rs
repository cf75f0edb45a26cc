pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod llm;
pub mod rate_limit;
pub mod scraper;
pub mod store;
pub mod summarize;

use std::sync::Arc;
use auth::AuthClient;
use config::Config;
use error::{AppError, Result};
use llm::ChatClient;
use rate_limit::DailyLimiter;
use store::SummaryStore;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: reqwest::Client,
    pub llm: Arc<ChatClient>,
    pub store: Arc<SummaryStore>,
    pub auth: Arc<AuthClient>,
    pub limiter: Arc<DailyLimiter>,
}

impl AppState {
    /// Builds every outbound client once from `config`.
    pub fn from_config(config: Config) -> Result<Self> {
        let client_err = |e: reqwest::Error| AppError::ConfigError(format!("Failed to build HTTP client: {}", e));

        let fetcher = scraper::build_fetch_client().map_err(client_err)?;
        let llm = ChatClient::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
        )
        .map_err(client_err)?;
        let store = SummaryStore::new(&config.supabase_url, config.supabase_key.clone()).map_err(client_err)?;
        let auth = AuthClient::new(&config.supabase_url, config.supabase_key.clone()).map_err(client_err)?;
        let limiter = DailyLimiter::new(config.daily_summary_limit);

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            llm: Arc::new(llm),
            store: Arc::new(store),
            auth: Arc::new(auth),
            limiter: Arc::new(limiter),
        })
    }
}

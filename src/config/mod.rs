use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the backend project (no trailing slash)
    pub backend_url: String,
    /// API key, sent both as `apikey` and as the bearer token
    pub backend_key: String,
    /// Organisation identifier passed to the tax-invoice sync function
    pub company_id: String,
    /// Directory scanned for local photos in the site diary form
    #[serde(default = "default_photo_dir")]
    pub photo_dir: String,
    /// Log file path; the terminal itself belongs to the TUI
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_photo_dir() -> String {
    "photos".to_string()
}

fn default_log_file() -> String {
    "sitedesk.log".to_string()
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Parse environment variables into Config struct
        let config = envy::from_env::<Config>()?;

        Ok(config)
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    dotenv().ok();

    let config = Config::load()?;

    Ok(config)
}

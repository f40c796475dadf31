use crate::errors::AppError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OMNIDIM_BASE_URL: &str = "https://backend.omnidim.io/api/v1";
pub const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_DRIVE_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Where leads are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadSourceKind {
    /// Google Sheets spreadsheet opened by name with a service account.
    Sheets,
    /// Local CSV file with a header row.
    Csv,
}

impl std::str::FromStr for LeadSourceKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" | "google_sheets" | "gsheets" => Ok(LeadSourceKind::Sheets),
            "csv" => Ok(LeadSourceKind::Csv),
            other => Err(AppError::ConfigError(format!(
                "LEAD_SOURCE must be 'sheets' or 'csv', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub omnidim_api_key: String,
    pub agent_id: i64,
    pub omnidim_base_url: String,
    pub poll_interval: Duration,
    pub lead_pause: Duration,
    pub dispatch_max_attempts: u32,
    pub dispatch_backoff: Duration,
    pub http_timeout: Duration,
    pub lead_source: LeadSourceKind,
    pub sheet_name: String,
    pub credentials_file: PathBuf,
    pub input_csv_path: PathBuf,
    pub state_file: PathBuf,
    pub sheets_api_base_url: String,
    pub drive_api_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            omnidim_api_key: std::env::var("OMNIDIM_API_KEY")
                .map_err(|_| anyhow::anyhow!("OMNIDIM_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("OMNIDIM_API_KEY cannot be empty");
                    }
                    Ok(key.trim().to_string())
                })?,
            agent_id: std::env::var("AGENT_ID")
                .map_err(|_| anyhow::anyhow!("AGENT_ID environment variable required"))?
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("AGENT_ID must be an integer"))?,
            omnidim_base_url: base_url_var("OMNIDIM_BASE_URL", DEFAULT_OMNIDIM_BASE_URL)?,
            poll_interval: Duration::from_secs(secs_var("POLL_INTERVAL", 5)?.max(1)),
            lead_pause: Duration::from_secs(secs_var("LEAD_PAUSE_SECS", 2)?),
            dispatch_max_attempts: std::env::var("DISPATCH_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("DISPATCH_MAX_ATTEMPTS must be a positive number"))
                .and_then(|n| {
                    if n == 0 {
                        anyhow::bail!("DISPATCH_MAX_ATTEMPTS must be at least 1");
                    }
                    Ok(n)
                })?,
            dispatch_backoff: Duration::from_secs(secs_var("DISPATCH_BACKOFF_SECS", 2)?),
            http_timeout: Duration::from_secs(secs_var("HTTP_TIMEOUT_SECS", 30)?.max(1)),
            lead_source: std::env::var("LEAD_SOURCE")
                .unwrap_or_else(|_| "sheets".to_string())
                .parse()?,
            sheet_name: std::env::var("SHEET_NAME")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "Real Estate Database".to_string()),
            credentials_file: path_var("CREDENTIALS_FILE", "credentials.json"),
            input_csv_path: path_var("INPUT_CSV_PATH", "leads_input.csv"),
            state_file: path_var("PROCESSED_STATE_FILE", "processed_leads.json"),
            sheets_api_base_url: base_url_var("SHEETS_API_BASE_URL", DEFAULT_SHEETS_API_BASE_URL)?,
            drive_api_base_url: base_url_var("DRIVE_API_BASE_URL", DEFAULT_DRIVE_API_BASE_URL)?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("OmniDim Base URL: {}", config.omnidim_base_url);
        tracing::debug!("Agent ID: {}", config.agent_id);
        tracing::debug!("Lead source: {:?}", config.lead_source);
        tracing::debug!("Poll interval: {:?}", config.poll_interval);
        tracing::debug!("State file: {}", config.state_file.display());

        Ok(config)
    }
}

/// Reads an optional whole-seconds variable.
fn secs_var(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", name)),
        _ => Ok(default),
    }
}

fn path_var(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Reads an optional base URL, validated and stripped of a trailing slash.
fn base_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let raw = std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());

    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }

    Ok(raw.trim().trim_end_matches('/').to_string())
}

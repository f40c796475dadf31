//! Google Sheets lead source.
//!
//! The spreadsheet is opened by name: the Drive API resolves the name to an id
//! once at startup, the Sheets API supplies the first worksheet's title, and
//! every poll reads that worksheet's full value grid. The sheet is never written.
use crate::config::Config;
use crate::errors::AppError;
use crate::lead_source::{leads_from_table, LeadSource};
use crate::models::Lead;
use async_trait::async_trait;
use gcp_auth::TokenProvider;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// OAuth scopes requested for the service account.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// Supplies bearer tokens for Google API calls.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AppError>;
}

/// Tokens minted from a service-account key file.
pub struct ServiceAccountTokens {
    provider: gcp_auth::CustomServiceAccount,
}

impl ServiceAccountTokens {
    pub fn from_file(path: &std::path::Path) -> Result<Self, AppError> {
        let provider = gcp_auth::CustomServiceAccount::from_file(path).map_err(|e| {
            AppError::Unauthorized(format!(
                "Failed to load service account from {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, AppError> {
        let token = self.provider.token(SCOPES).await?;
        Ok(token.as_str().to_string())
    }
}

/// A fixed token, for pre-minted credentials and tests.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AppError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Endpoints used by [`GoogleSheetsSource`].
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub sheets_base_url: String,
    pub drive_base_url: String,
}

impl GoogleEndpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            sheets_base_url: config.sheets_api_base_url.clone(),
            drive_base_url: config.drive_api_base_url.clone(),
        }
    }
}

/// Reads leads from the first worksheet of a named spreadsheet.
pub struct GoogleSheetsSource {
    client: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    endpoints: GoogleEndpoints,
    spreadsheet_name: String,
    spreadsheet_id: String,
    worksheet_title: String,
}

impl GoogleSheetsSource {
    /// Authenticates with the configured credentials file and opens the sheet.
    ///
    /// Any failure here is an initialization failure.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let tokens = Arc::new(ServiceAccountTokens::from_file(&config.credentials_file)?);
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::SourceError(format!("Failed to create HTTP client: {}", e)))?;

        Self::open(
            client,
            tokens,
            GoogleEndpoints::from_config(config),
            &config.sheet_name,
        )
        .await
    }

    /// Resolves `spreadsheet_name` and its first worksheet.
    pub async fn open(
        client: reqwest::Client,
        tokens: Arc<dyn AccessTokenSource>,
        endpoints: GoogleEndpoints,
        spreadsheet_name: &str,
    ) -> Result<Self, AppError> {
        let mut source = Self {
            client,
            tokens,
            endpoints,
            spreadsheet_name: spreadsheet_name.to_string(),
            spreadsheet_id: String::new(),
            worksheet_title: String::new(),
        };

        source.spreadsheet_id = source.find_spreadsheet_id().await?;
        source.worksheet_title = source.first_worksheet_title().await?;

        tracing::info!(
            "Opened spreadsheet '{}' ({}), worksheet '{}'",
            source.spreadsheet_name,
            source.spreadsheet_id,
            source.worksheet_title
        );
        Ok(source)
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn worksheet_title(&self) -> &str {
        &self.worksheet_title
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
    ) -> Result<T, AppError> {
        let token = self.tokens.access_token().await?;
        tracing::debug!("Google API request ({}): {}", what, url);

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::SourceError(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Unauthorized(format!(
                "{} returned {}: {}",
                what, status, error_text
            )));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::SourceError(format!(
                "{} returned {}: {}",
                what, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::SourceError(format!("Failed to parse {} response: {}", what, e)))
    }

    async fn find_spreadsheet_id(&self) -> Result<String, AppError> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_drive_literal(&self.spreadsheet_name),
            SPREADSHEET_MIME_TYPE
        );
        let url = Url::parse_with_params(
            &format!("{}/files", self.endpoints.drive_base_url),
            &[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ],
        )
        .map_err(|e| AppError::SourceError(format!("Failed to build Drive URL: {}", e)))?;

        let list: DriveFileList = self.get_json(url, "Drive file search").await?;
        if list.files.len() > 1 {
            tracing::warn!(
                "{} spreadsheets named '{}', using the first ({})",
                list.files.len(),
                self.spreadsheet_name,
                list.files[0].name
            );
        }

        list.files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Spreadsheet '{}' not found or not shared with the service account",
                    self.spreadsheet_name
                ))
            })
    }

    async fn first_worksheet_title(&self) -> Result<String, AppError> {
        let mut url = self.spreadsheet_url()?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(title,index)");

        let metadata: SpreadsheetMetadata = self.get_json(url, "Spreadsheet metadata").await?;
        metadata
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties)
            .min_by_key(|props| props.index)
            .map(|props| props.title)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Spreadsheet '{}' has no worksheets",
                    self.spreadsheet_name
                ))
            })
    }

    fn spreadsheet_url(&self) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.endpoints.sheets_base_url)
            .map_err(|e| AppError::SourceError(format!("Invalid Sheets API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::SourceError("Sheets API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str()]);
        Ok(url)
    }

    fn values_url(&self) -> Result<Url, AppError> {
        let mut url = self.spreadsheet_url()?;
        let range = format!("'{}'", self.worksheet_title.replace('\'', "''"));
        url.path_segments_mut()
            .map_err(|_| AppError::SourceError("Sheets API URL cannot be a base".to_string()))?
            .extend(["values", range.as_str()]);
        url.query_pairs_mut()
            .append_pair("majorDimension", "ROWS")
            .append_pair("valueRenderOption", "FORMATTED_VALUE");
        Ok(url)
    }
}

#[async_trait]
impl LeadSource for GoogleSheetsSource {
    async fn fetch_all(&self) -> Result<Vec<Lead>, AppError> {
        let url = self.values_url()?;
        let range: ValueRange = self.get_json(url, "Sheet values").await?;

        let mut rows = range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());

        let Some(headers) = rows.next() else {
            tracing::debug!("Worksheet '{}' is empty", self.worksheet_title);
            return Ok(Vec::new());
        };

        let leads = leads_from_table(&headers, rows);
        tracing::debug!("Read {} lead rows from '{}'", leads.len(), self.spreadsheet_name);
        Ok(leads)
    }

    fn describe(&self) -> String {
        format!(
            "Google Sheet '{}' / '{}'",
            self.spreadsheet_name, self.worksheet_title
        )
    }
}

/// Renders a cell as text. Formatted values are strings already; numbers and
/// booleans can still appear when a formula returns them.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Escapes a string for use inside a single-quoted Drive query literal.
fn escape_drive_literal(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

use crate::config::{Config, LeadSourceKind};
use crate::csv_source::CsvLeadSource;
use crate::errors::AppError;
use crate::models::{Lead, LeadRow};
use crate::sheets::GoogleSheetsSource;
use async_trait::async_trait;
use std::sync::Arc;

/// A backend that returns every lead row on each call.
///
/// No pagination and no retry: errors go straight back to the polling loop.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<Lead>, AppError>;

    /// Human-readable name for logs.
    fn describe(&self) -> String;
}

/// Builds the source selected by `LEAD_SOURCE`.
pub async fn connect(config: &Config) -> Result<Arc<dyn LeadSource>, AppError> {
    match config.lead_source {
        LeadSourceKind::Sheets => {
            let source = GoogleSheetsSource::connect(config).await?;
            Ok(Arc::new(source))
        }
        LeadSourceKind::Csv => {
            tracing::info!("Reading leads from {}", config.input_csv_path.display());
            Ok(Arc::new(CsvLeadSource::new(&config.input_csv_path)))
        }
    }
}

/// Turns a header row plus data rows into leads, in order.
///
/// Fully blank rows are skipped; short rows are padded with empty cells.
pub fn leads_from_table<I>(headers: &[String], rows: I) -> Vec<Lead>
where
    I: IntoIterator<Item = Vec<String>>,
{
    rows.into_iter()
        .map(|cells| LeadRow::from_cells(headers, &cells))
        .filter(|row| !row.is_blank())
        .map(Lead::from_row)
        .collect()
}

use crate::errors::{AppError, ResultExt};
use crate::lead_source::{leads_from_table, LeadSource};
use crate::models::Lead;
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads leads from a local CSV file with a header row.
///
/// The file is re-read on every poll, so rows appended between polls are picked up.
#[derive(Debug, Clone)]
pub struct CsvLeadSource {
    path: PathBuf,
}

impl CsvLeadSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(raw: &[u8]) -> Result<Vec<Lead>, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(raw);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(leads_from_table(&headers, rows))
    }
}

#[async_trait]
impl LeadSource for CsvLeadSource {
    async fn fetch_all(&self) -> Result<Vec<Lead>, AppError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AppError::SourceError(e.to_string()))
            .with_context(|| format!("Reading {}", self.path.display()))?;

        let leads = Self::parse(&raw)?;
        tracing::debug!("Read {} lead rows from {}", leads.len(), self.path.display());
        Ok(leads)
    }

    fn describe(&self) -> String {
        format!("CSV file {}", self.path.display())
    }
}

use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::lead_source::LeadSource;
use crate::models::Lead;
use crate::processor::{LeadOutcome, LeadProcessor};
use crate::shutdown::Shutdown;
use std::sync::Arc;
use std::time::Duration;

/// Where the polling loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next poll.
    Idle,
    /// Draining the current batch of new leads.
    Processing,
}

/// Counts for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub fetched: usize,
    /// Rows with neither a `lead_id` nor a `Timestamp`.
    pub unidentified: usize,
    pub new: usize,
    pub dispatched: usize,
    pub failed: usize,
    pub invalid_phone: usize,
    pub interrupted: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: &LeadOutcome) {
        match outcome {
            LeadOutcome::Dispatched { .. } => self.dispatched += 1,
            LeadOutcome::Failed { .. } => self.failed += 1,
            LeadOutcome::InvalidPhone(_) => self.invalid_phone += 1,
            LeadOutcome::Interrupted { .. } => self.interrupted += 1,
            // already counted from the fetched rows, or deduped before processing
            LeadOutcome::MissingId | LeadOutcome::AlreadyProcessed => {}
        }
    }
}

/// Fetch → filter → process → sleep, forever, until shutdown.
pub struct Poller {
    source: Arc<dyn LeadSource>,
    processor: LeadProcessor,
    poll_interval: Duration,
    lead_pause: Duration,
    shutdown: Shutdown,
    state: LoopState,
}

impl Poller {
    pub fn new(
        source: Arc<dyn LeadSource>,
        processor: LeadProcessor,
        poll_interval: Duration,
        lead_pause: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            source,
            processor,
            poll_interval,
            lead_pause,
            shutdown,
            state: LoopState::Idle,
        }
    }

    pub fn from_config(
        config: &Config,
        source: Arc<dyn LeadSource>,
        processor: LeadProcessor,
        shutdown: Shutdown,
    ) -> Self {
        Self::new(
            source,
            processor,
            config.poll_interval,
            config.lead_pause,
            shutdown,
        )
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn processor(&self) -> &LeadProcessor {
        &self.processor
    }

    /// One poll: fetch every row, process the new ones sequentially.
    ///
    /// Only the fetch can fail; per-lead failures are part of the summary.
    pub async fn run_cycle(&mut self) -> Result<CycleSummary, AppError> {
        let leads = self
            .source
            .fetch_all()
            .await
            .context(format!("Fetching leads from {}", self.source.describe()))?;

        let mut summary = CycleSummary {
            fetched: leads.len(),
            unidentified: leads.iter().filter(|lead| lead.id().is_none()).count(),
            ..Default::default()
        };
        if summary.unidentified > 0 {
            tracing::debug!(
                "{} row(s) have no lead_id or Timestamp and are ignored",
                summary.unidentified
            );
        }

        let new_leads: Vec<Lead> = self
            .processor
            .select_new(&leads)
            .into_iter()
            .cloned()
            .collect();
        summary.new = new_leads.len();
        if new_leads.is_empty() {
            return Ok(summary);
        }

        tracing::info!("Found {} new lead(s)", new_leads.len());
        self.state = LoopState::Processing;

        for (idx, lead) in new_leads.iter().enumerate() {
            if self.shutdown.is_triggered() {
                break;
            }

            let outcome = self.processor.process(lead).await;
            summary.record(&outcome);
            if matches!(outcome, LeadOutcome::Interrupted { .. }) {
                break;
            }

            let more = idx + 1 < new_leads.len();
            if more && !self.shutdown.sleep(self.lead_pause).await {
                break;
            }
        }

        self.state = LoopState::Idle;
        tracing::info!(
            "Cycle complete: {} fetched, {} new, {} dispatched, {} failed, {} invalid phone, {} interrupted",
            summary.fetched,
            summary.new,
            summary.dispatched,
            summary.failed,
            summary.invalid_phone,
            summary.interrupted
        );
        Ok(summary)
    }

    /// Runs until shutdown. A failing cycle is logged and retried after the
    /// poll interval; nothing inside a cycle stops the loop.
    pub async fn run(mut self) {
        tracing::info!(
            "Automation started. Monitoring {} for new leads (poll interval {:?})",
            self.source.describe(),
            self.poll_interval
        );

        while !self.shutdown.is_triggered() {
            if let Err(e) = self.run_cycle().await {
                tracing::error!("Error in polling cycle: {}", e);
            }
            self.state = LoopState::Idle;

            if !self.shutdown.sleep(self.poll_interval).await {
                break;
            }
        }

        tracing::info!(
            "Automation stopped; {} lead id(s) recorded as processed",
            self.processor.processed().len()
        );
    }
}

//! Per-lead processing: dedup filter, phone normalization, retried dispatch and
//! state update.
//!
//! A lead with an identifier is marked processed once it has been handled,
//! whatever the outcome (dispatched, retries exhausted, uncallable phone).
//! Only a shutdown in the middle of a retry sequence leaves it unmarked.
use crate::dispatcher::CallDispatcher;
use crate::models::{DispatchReceipt, Lead};
use crate::phone::{self, PhoneRejection};
use crate::retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
use crate::shutdown::Shutdown;
use crate::state_store::ProcessedSet;
use std::collections::HashSet;
use std::sync::Arc;

/// Leads with a non-empty identifier that is not yet in `processed`, in source order.
///
/// An identifier repeated within `leads` is selected once, at its first row.
/// Leads without an identifier are never selected and never persisted, so they
/// are looked at again (and skipped again) on every poll.
pub fn select_new<'a>(leads: &'a [Lead], processed: &HashSet<String>) -> Vec<&'a Lead> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut selected = Vec::new();

    for lead in leads {
        let Some(id) = lead.id() else { continue };
        if !processed.contains(id) && seen.insert(id) {
            selected.push(lead);
        }
    }
    selected
}

/// What happened to one lead.
#[derive(Debug)]
pub enum LeadOutcome {
    Dispatched {
        receipt: DispatchReceipt,
        attempts: u32,
    },
    /// Every attempt failed; the lead is still marked processed.
    Failed { attempts: u32, error: String },
    /// Phone could not be normalized; marked processed without dispatching.
    InvalidPhone(PhoneRejection),
    /// No identifier, nothing to dedup on; not dispatched, not persisted.
    MissingId,
    /// Identifier already in the processed set; not dispatched again.
    AlreadyProcessed,
    /// Shutdown fired during backoff; not marked processed.
    Interrupted { attempts: u32 },
}

impl LeadOutcome {
    /// Whether the lead's identifier ends up in the processed set.
    pub fn is_handled(&self) -> bool {
        !matches!(self, LeadOutcome::MissingId | LeadOutcome::Interrupted { .. })
    }
}

pub struct LeadProcessor {
    dispatcher: Arc<dyn CallDispatcher>,
    processed: ProcessedSet,
    policy: RetryPolicy,
    shutdown: Shutdown,
}

impl LeadProcessor {
    pub fn new(
        dispatcher: Arc<dyn CallDispatcher>,
        processed: ProcessedSet,
        policy: RetryPolicy,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            dispatcher,
            processed,
            policy,
            shutdown,
        }
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// New leads among `leads`, against the current processed set.
    pub fn select_new<'a>(&self, leads: &'a [Lead]) -> Vec<&'a Lead> {
        select_new(leads, self.processed.ids())
    }

    /// Handles one lead to completion, including persisting its identifier.
    pub async fn process(&mut self, lead: &Lead) -> LeadOutcome {
        let Some(lead_id) = lead.id() else {
            tracing::debug!("Lead '{}' has no identifier, skipping", lead.display_name());
            return LeadOutcome::MissingId;
        };

        if self.processed.contains(lead_id) {
            tracing::debug!("Lead {} already processed, skipping", lead_id);
            return LeadOutcome::AlreadyProcessed;
        }

        let phone = match phone::normalize(&lead.raw_phone) {
            Ok(phone) => phone,
            Err(rejection) => {
                tracing::info!(
                    "Lead {} has no valid phone number ({}), skipping",
                    lead_id,
                    rejection
                );
                self.processed.mark(lead_id).await;
                return LeadOutcome::InvalidPhone(rejection);
            }
        };

        tracing::info!("Processing lead {}: {}", lead_id, lead.display_name());

        let dispatcher = &self.dispatcher;
        let phone = &phone;
        let label = format!("lead {}", lead_id);
        let outcome = retry_with_backoff(&self.policy, &self.shutdown, &label, move |_| {
            dispatcher.dispatch(phone, lead)
        })
        .await;

        let result = match outcome {
            RetryOutcome::Succeeded { value, attempts } => {
                tracing::info!("✓ Call dispatched for lead {}: {}", lead_id, value);
                LeadOutcome::Dispatched {
                    receipt: value,
                    attempts,
                }
            }
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                tracing::error!(
                    "✗ Failed to dispatch call for lead {} after {} attempts: {}",
                    lead_id,
                    attempts,
                    last_error
                );
                LeadOutcome::Failed {
                    attempts,
                    error: last_error.to_string(),
                }
            }
            RetryOutcome::Cancelled { attempts } => {
                tracing::warn!(
                    "Lead {} interrupted after {} attempt(s); it stays unprocessed",
                    lead_id,
                    attempts
                );
                return LeadOutcome::Interrupted { attempts };
            }
        };

        self.processed.mark(lead_id).await;
        result
    }
}

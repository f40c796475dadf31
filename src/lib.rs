//! Lead Dialer Library
//!
//! Polls a spreadsheet-backed lead list and asks the OmniDimension calling API
//! to phone every new lead exactly once, remembering handled leads in a local
//! state file.
//!
//! # Modules
//!
//! - `core`: Lead selection, processing and the polling loop.
//! - `integrations`: Google Sheets and calling API clients.
//! - `config`: Configuration management.
//! - `csv_source`: CSV file lead source.
//! - `dispatcher`: OmniDimension call dispatch client.
//! - `errors`: Error handling types.
//! - `lead_source`: Lead source trait and row mapping.
//! - `models`: Lead and dispatch data models.
//! - `phone`: Phone number normalization.
//! - `poller`: Polling loop.
//! - `processor`: Dedup filter and per-lead processing.
//! - `retry`: Linear backoff retry.
//! - `sheets`: Google Sheets lead source.
//! - `shutdown`: Cancellable sleeps and signal handling.
//! - `state_store`: Processed-id persistence.

pub mod core;
pub mod integrations;

pub mod config;
pub mod csv_source;
pub mod dispatcher;
pub mod errors;
pub mod lead_source;
pub mod models;
pub mod phone;
pub mod poller;
pub mod processor;
pub mod retry;
pub mod sheets;
pub mod shutdown;
pub mod state_store;

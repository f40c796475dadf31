//! Utility to inspect the configured lead source without dispatching anything.

use std::collections::BTreeSet;

use lead_dialer::config::Config;
use lead_dialer::lead_source;
use lead_dialer::phone;
use lead_dialer::processor::select_new;
use lead_dialer::state_store::StateStore;

/// Main entry point for the inspection utility.
///
/// Fetches every row once, prints the columns seen, how many rows are
/// unidentifiable, and which leads the dialer would pick up on its next poll.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let source = lead_source::connect(&config).await?;
    let leads = source.fetch_all().await?;
    let store = StateStore::new(&config.state_file);
    let processed = store.load().await;

    let columns: BTreeSet<&str> = leads
        .iter()
        .flat_map(|lead| lead.fields.keys().map(String::as_str))
        .collect();

    println!("Source: {}", source.describe());
    println!("Columns:");
    for column in &columns {
        println!("  - {}", column);
    }
    println!();

    let unidentified = leads.iter().filter(|lead| lead.id().is_none()).count();
    let new_leads = select_new(&leads, &processed);

    println!("Rows: {}", leads.len());
    println!("Without lead_id/Timestamp: {}", unidentified);
    println!(
        "Already processed ids: {} ({})",
        processed.len(),
        store.path().display()
    );
    println!("New leads: {}", new_leads.len());

    for lead in new_leads {
        let phone = match phone::normalize(&lead.raw_phone) {
            Ok(phone) => phone.submission(),
            Err(rejection) => format!("(skipped: {})", rejection),
        };
        println!(
            "  - {} | {} | {}",
            lead.id().unwrap_or_default(),
            lead.display_name(),
            phone
        );
    }

    Ok(())
}

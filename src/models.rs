use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column headers the lead mapping looks up (case-insensitive, trimmed).
pub mod columns {
    /// Explicit lead identifier, preferred.
    pub const LEAD_ID: &str = "lead_id";
    /// Form submission timestamp, fallback identifier.
    pub const TIMESTAMP: &str = "Timestamp";
    pub const NAME: &str = "Name";
    pub const PHONE: &str = "Phone Number";
    pub const EMAIL: &str = "Email";
}

/// One spreadsheet row, as read from the backing sheet.
///
/// Every header maps to the cell's text; missing trailing cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadRow {
    cells: BTreeMap<String, String>,
}

impl LeadRow {
    /// Zips a header row with a data row. Extra cells without a header are dropped,
    /// missing cells become empty strings.
    pub fn from_cells(headers: &[String], cells: &[String]) -> Self {
        let cells = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.trim().is_empty())
            .map(|(idx, header)| {
                let value = cells.get(idx).cloned().unwrap_or_default();
                (header.trim().to_string(), value)
            })
            .collect();

        Self { cells }
    }

    /// Case-insensitive column lookup; missing columns yield an empty string.
    pub fn get(&self, column: &str) -> &str {
        self.cells
            .get(column)
            .or_else(|| {
                self.cells
                    .iter()
                    .find(|(header, _)| header.eq_ignore_ascii_case(column))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }

    pub fn into_cells(self) -> BTreeMap<String, String> {
        self.cells
    }
}

/// A contact to be called, derived from a [`LeadRow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    /// Identifier used for deduplication. `None` when neither the `lead_id`
    /// nor the `Timestamp` column carries a value.
    pub id: Option<String>,
    pub name: String,
    /// Phone exactly as typed in the sheet.
    pub raw_phone: String,
    pub email: String,
    /// All columns of the row, including the ones above.
    pub fields: BTreeMap<String, String>,
}

impl Lead {
    /// Builds a lead from a row.
    ///
    /// Identifier precedence: trimmed `lead_id`, then trimmed `Timestamp`.
    pub fn from_row(row: LeadRow) -> Self {
        let id = non_empty(row.get(columns::LEAD_ID))
            .or_else(|| non_empty(row.get(columns::TIMESTAMP)));
        let name = row.get(columns::NAME).trim().to_string();
        let raw_phone = row.get(columns::PHONE).to_string();
        let email = row.get(columns::EMAIL).trim().to_string();

        Self {
            id,
            name,
            raw_phone,
            email,
            fields: row.into_cells(),
        }
    }

    /// The dedup identifier, if any.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Name for logs and call context.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unknown"
        } else {
            &self.name
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lead fields exposed to the calling agent. Nothing else from the row is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallContext {
    pub customer_name: String,
    pub email: String,
    pub lead_id: String,
}

impl CallContext {
    pub fn from_lead(lead: &Lead) -> Self {
        Self {
            customer_name: lead.display_name().to_string(),
            email: if lead.email.is_empty() {
                "N/A".to_string()
            } else {
                lead.email.clone()
            },
            lead_id: lead.id().unwrap_or("N/A").to_string(),
        }
    }
}

/// Body of `POST /calls/dispatch`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchRequest {
    pub agent_id: i64,
    pub to_number: String,
    pub call_context: CallContext,
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchReceipt {
    /// The API returned a call identifier.
    CallId(String),
    /// 2xx without a recognizable identifier.
    Accepted,
}

impl DispatchReceipt {
    pub fn call_id(&self) -> Option<&str> {
        match self {
            DispatchReceipt::CallId(id) => Some(id),
            DispatchReceipt::Accepted => None,
        }
    }
}

impl std::fmt::Display for DispatchReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchReceipt::CallId(id) => write!(f, "call {}", id),
            DispatchReceipt::Accepted => write!(f, "accepted (no call id)"),
        }
    }
}

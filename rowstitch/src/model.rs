use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Invoice aggregate: one header row plus an ordered run of line items.
/// `number` is the natural key and never changes after the first insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub due_date: NaiveDate,
    pub total: BigDecimal,
    pub paid: Option<DateTime<Utc>>,
    pub canceled: bool,
    pub version: i64,
    pub tax: BigDecimal,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Stamped by `SyncWriter::update`, visible on the aggregate afterwards.
    pub modified_at: DateTime<Utc>,
    /// Position in this list is the persisted child index: dense, zero-based.
    pub lines: Vec<LineItem>,
}

/// Line item owned by exactly one invoice. Carries no reference back to its
/// owner; the header key is supplied explicitly when a row is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: String,
    pub cost: BigDecimal,
    pub quantity: i32,
    pub tax_group: BigDecimal,
    pub discount: BigDecimal,
}

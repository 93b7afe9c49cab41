//! Row layouts and the conversions between rows and records.
//!
//! Every statement and query exchanges `Row`s in one of four layouts, all
//! defined here and nowhere else:
//!
//! * header:        number, due_date, total, paid, canceled, version, tax,
//!                  reference, created_at, modified_at
//! * header update: due_date, total, paid, canceled, version, tax, reference,
//!                  modified_at, number
//! * line:          number, index, product, cost, quantity, tax_group, discount
//! * line update:   product, cost, quantity, tax_group, discount, number, index
//!
//! Update layouts put the key columns last, the way a SET/WHERE statement
//! binds them. `created_at` is absent from the header update layout; the
//! creation stamp survives every update.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::DecodeError;
use crate::model::{Invoice, LineItem};
use crate::store::{Row, Value};

mod head {
    pub const KEY: usize = 0;
    pub const DUE_DATE: usize = 1;
    pub const TOTAL: usize = 2;
    pub const PAID: usize = 3;
    pub const CANCELED: usize = 4;
    pub const VERSION: usize = 5;
    pub const TAX: usize = 6;
    pub const REFERENCE: usize = 7;
    pub const CREATED_AT: usize = 8;
    pub const MODIFIED_AT: usize = 9;
}

mod up_head {
    pub const DUE_DATE: usize = 0;
    pub const TOTAL: usize = 1;
    pub const PAID: usize = 2;
    pub const CANCELED: usize = 3;
    pub const VERSION: usize = 4;
    pub const TAX: usize = 5;
    pub const REFERENCE: usize = 6;
    pub const MODIFIED_AT: usize = 7;
    pub const KEY: usize = 8;
}

mod line {
    pub const KEY: usize = 0;
    pub const INDEX: usize = 1;
    pub const PRODUCT: usize = 2;
    pub const COST: usize = 3;
    pub const QUANTITY: usize = 4;
    pub const TAX_GROUP: usize = 5;
    pub const DISCOUNT: usize = 6;
}

mod up_line {
    pub const PRODUCT: usize = 0;
    pub const COST: usize = 1;
    pub const QUANTITY: usize = 2;
    pub const TAX_GROUP: usize = 3;
    pub const DISCOUNT: usize = 4;
    pub const KEY: usize = 5;
    pub const INDEX: usize = 6;
}

mod del {
    pub const KEY: usize = 0;
    pub const FROM: usize = 1;
}

pub fn encode_header(invoice: &Invoice) -> Row {
    vec![
        Value::Text(invoice.number.clone()),
        Value::Date(invoice.due_date),
        Value::Decimal(invoice.total.clone()),
        Value::opt_timestamp(invoice.paid),
        Value::Bool(invoice.canceled),
        Value::Int(invoice.version),
        Value::Decimal(invoice.tax.clone()),
        Value::opt_text(invoice.reference.clone()),
        Value::Timestamp(invoice.created_at),
        Value::Timestamp(invoice.modified_at),
    ]
}

pub fn encode_header_update(invoice: &Invoice) -> Row {
    vec![
        Value::Date(invoice.due_date),
        Value::Decimal(invoice.total.clone()),
        Value::opt_timestamp(invoice.paid),
        Value::Bool(invoice.canceled),
        Value::Int(invoice.version),
        Value::Decimal(invoice.tax.clone()),
        Value::opt_text(invoice.reference.clone()),
        Value::Timestamp(invoice.modified_at),
        Value::Text(invoice.number.clone()),
    ]
}

pub fn encode_child(key: &str, index: u32, item: &LineItem) -> Row {
    vec![
        Value::Text(key.to_string()),
        Value::Int(i64::from(index)),
        Value::Text(item.product.clone()),
        Value::Decimal(item.cost.clone()),
        Value::Int(i64::from(item.quantity)),
        Value::Decimal(item.tax_group.clone()),
        Value::Decimal(item.discount.clone()),
    ]
}

pub fn encode_child_update(key: &str, index: u32, item: &LineItem) -> Row {
    vec![
        Value::Text(item.product.clone()),
        Value::Decimal(item.cost.clone()),
        Value::Int(i64::from(item.quantity)),
        Value::Decimal(item.tax_group.clone()),
        Value::Decimal(item.discount.clone()),
        Value::Text(key.to_string()),
        Value::Int(i64::from(index)),
    ]
}

/// Parameter row for `DeleteChildrenFrom`: every child of `key` with an
/// index >= `from` goes away.
pub fn encode_delete_from(key: &str, from: u32) -> Row {
    vec![Value::Text(key.to_string()), Value::Int(i64::from(from))]
}

/// Single-key parameter row for `DeleteChildren` and `DeleteHeader`.
pub fn encode_key(key: &str) -> Row {
    vec![Value::Text(key.to_string())]
}

/// Decodes a header row into an invoice with an empty line list.
pub fn decode_header(row: &Row) -> Result<Invoice, DecodeError> {
    Ok(Invoice {
        number: text(row, head::KEY, "header", "number")?,
        due_date: date(row, head::DUE_DATE, "header", "due_date")?,
        total: decimal(row, head::TOTAL, "header", "total")?,
        paid: opt_timestamp(row, head::PAID, "header", "paid")?,
        canceled: boolean(row, head::CANCELED, "header", "canceled")?,
        version: int(row, head::VERSION, "header", "version")?,
        tax: decimal(row, head::TAX, "header", "tax")?,
        reference: opt_text(row, head::REFERENCE, "header", "reference")?,
        created_at: timestamp(row, head::CREATED_AT, "header", "created_at")?,
        modified_at: timestamp(row, head::MODIFIED_AT, "header", "modified_at")?,
        lines: Vec::new(),
    })
}

/// Decodes a line row into its owning key, its index and the item.
pub fn decode_child(row: &Row) -> Result<(String, u32, LineItem), DecodeError> {
    let key = text(row, line::KEY, "line", "number")?;
    let index = index_at(row, line::INDEX, "line", "index")?;
    let item = LineItem {
        product: text(row, line::PRODUCT, "line", "product")?,
        cost: decimal(row, line::COST, "line", "cost")?,
        quantity: int32(row, line::QUANTITY, "line", "quantity")?,
        tax_group: decimal(row, line::TAX_GROUP, "line", "tax_group")?,
        discount: decimal(row, line::DISCOUNT, "line", "discount")?,
    };
    Ok((key, index, item))
}

/// Reads the result of a `MaxChildIndex` query: one row, one `Int` cell,
/// -1 standing for "no child rows".
pub fn decode_max_index(rows: &[Row]) -> Result<i64, DecodeError> {
    let row = rows.first().ok_or(DecodeError::Missing { row: "max_index", column: "max" })?;
    int(row, 0, "max_index", "max")
}

pub fn header_key(row: &Row) -> Result<&str, DecodeError> {
    text_ref(row, head::KEY, "header", "number")
}

pub fn header_version(row: &Row) -> Result<i64, DecodeError> {
    int(row, head::VERSION, "header", "version")
}

pub fn header_created_at(row: &Row) -> Result<DateTime<Utc>, DecodeError> {
    timestamp(row, head::CREATED_AT, "header", "created_at")
}

pub fn child_locator(row: &Row) -> Result<(&str, u32), DecodeError> {
    Ok((text_ref(row, line::KEY, "line", "number")?, index_at(row, line::INDEX, "line", "index")?))
}

pub fn update_header_key(row: &Row) -> Result<&str, DecodeError> {
    text_ref(row, up_head::KEY, "header update", "number")
}

pub fn update_child_locator(row: &Row) -> Result<(&str, u32), DecodeError> {
    Ok((
        text_ref(row, up_line::KEY, "line update", "number")?,
        index_at(row, up_line::INDEX, "line update", "index")?,
    ))
}

pub fn key_row(row: &Row) -> Result<&str, DecodeError> {
    text_ref(row, 0, "key", "number")
}

pub fn delete_from_locator(row: &Row) -> Result<(&str, u32), DecodeError> {
    Ok((
        text_ref(row, del::KEY, "child delete", "number")?,
        index_at(row, del::FROM, "child delete", "from")?,
    ))
}

/// Applies a header-update row to a stored header row, yielding the new
/// stored row. Only `created_at` survives from the stored row.
pub fn apply_header_update(stored: &Row, update: &Row) -> Result<Row, DecodeError> {
    Ok(vec![
        cell(update, up_head::KEY, "header update", "number")?.clone(),
        cell(update, up_head::DUE_DATE, "header update", "due_date")?.clone(),
        cell(update, up_head::TOTAL, "header update", "total")?.clone(),
        cell(update, up_head::PAID, "header update", "paid")?.clone(),
        cell(update, up_head::CANCELED, "header update", "canceled")?.clone(),
        cell(update, up_head::VERSION, "header update", "version")?.clone(),
        cell(update, up_head::TAX, "header update", "tax")?.clone(),
        cell(update, up_head::REFERENCE, "header update", "reference")?.clone(),
        cell(stored, head::CREATED_AT, "header", "created_at")?.clone(),
        cell(update, up_head::MODIFIED_AT, "header update", "modified_at")?.clone(),
    ])
}

/// Rebuilds the stored line row from a line-update row; a child update
/// replaces every non-key column.
pub fn child_row_from_update(update: &Row) -> Result<Row, DecodeError> {
    Ok(vec![
        cell(update, up_line::KEY, "line update", "number")?.clone(),
        cell(update, up_line::INDEX, "line update", "index")?.clone(),
        cell(update, up_line::PRODUCT, "line update", "product")?.clone(),
        cell(update, up_line::COST, "line update", "cost")?.clone(),
        cell(update, up_line::QUANTITY, "line update", "quantity")?.clone(),
        cell(update, up_line::TAX_GROUP, "line update", "tax_group")?.clone(),
        cell(update, up_line::DISCOUNT, "line update", "discount")?.clone(),
    ])
}

fn cell<'a>(row: &'a Row, index: usize, kind: &'static str, column: &'static str) -> Result<&'a Value, DecodeError> {
    row.get(index).ok_or(DecodeError::Missing { row: kind, column })
}

fn text(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<String, DecodeError> {
    text_ref(row, index, kind, column).map(str::to_string)
}

fn text_ref<'a>(row: &'a Row, index: usize, kind: &'static str, column: &'static str) -> Result<&'a str, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Text(value) => Ok(value.as_str()),
        Value::Null => Err(DecodeError::Null { row: kind, column }),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "text", found: other.kind() }),
    }
}

fn opt_text(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<Option<String>, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Text(value) => Ok(Some(value.clone())),
        Value::Null => Ok(None),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "text", found: other.kind() }),
    }
}

fn int(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<i64, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Int(value) => Ok(*value),
        Value::Null => Err(DecodeError::Null { row: kind, column }),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "int", found: other.kind() }),
    }
}

fn int32(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<i32, DecodeError> {
    i32::try_from(int(row, index, kind, column)?).map_err(|_| DecodeError::OutOfRange { row: kind, column })
}

fn index_at(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<u32, DecodeError> {
    u32::try_from(int(row, index, kind, column)?).map_err(|_| DecodeError::OutOfRange { row: kind, column })
}

fn boolean(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<bool, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Bool(value) => Ok(*value),
        Value::Null => Err(DecodeError::Null { row: kind, column }),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "bool", found: other.kind() }),
    }
}

fn decimal(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<BigDecimal, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Decimal(value) => Ok(value.clone()),
        Value::Null => Err(DecodeError::Null { row: kind, column }),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "decimal", found: other.kind() }),
    }
}

fn date(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<NaiveDate, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Date(value) => Ok(*value),
        Value::Null => Err(DecodeError::Null { row: kind, column }),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "date", found: other.kind() }),
    }
}

fn timestamp(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<DateTime<Utc>, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Timestamp(value) => Ok(*value),
        Value::Null => Err(DecodeError::Null { row: kind, column }),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "timestamp", found: other.kind() }),
    }
}

fn opt_timestamp(row: &Row, index: usize, kind: &'static str, column: &'static str) -> Result<Option<DateTime<Utc>>, DecodeError> {
    match cell(row, index, kind, column)? {
        Value::Timestamp(value) => Ok(Some(*value)),
        Value::Null => Ok(None),
        other => Err(DecodeError::Mismatch { row: kind, column, expected: "timestamp", found: other.kind() }),
    }
}

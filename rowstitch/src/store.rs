use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{DecodeError, StoreError};

/// One cell of a relational row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Decimal(BigDecimal),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

pub type Row = Vec<Value>;

impl Value {
    pub fn opt_text(value: Option<String>) -> Value {
        value.map_or(Value::Null, Value::Text)
    }

    pub fn opt_timestamp(value: Option<DateTime<Utc>>) -> Value {
        value.map_or(Value::Null, Value::Timestamp)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Text(_) => "text",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

/// The fixed menu of batched statement shapes, the prepared-statement
/// analogue. Parameter row layouts are owned by the codec module.
///
/// Inserts enforce key uniqueness and `InsertChild` additionally requires the
/// owning header row to exist in the same transaction. Updates on a missing
/// row affect zero rows instead of failing. `DeleteAllChildren` and
/// `DeleteAllHeaders` take a single empty parameter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    InsertHeader,
    UpdateHeader,
    InsertChild,
    UpdateChild,
    DeleteChildrenFrom,
    DeleteChildren,
    DeleteHeader,
    DeleteAllChildren,
    DeleteAllHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderFilter {
    All,
    KeyIs(String),
    KeyIn(Vec<String>),
    VersionAtLeast(i64),
    VersionAtMost(i64),
    VersionBetween(i64, i64),
}

impl HeaderFilter {
    pub fn matches(&self, row: &Row) -> Result<bool, DecodeError> {
        let verdict = match self {
            HeaderFilter::All => true,
            HeaderFilter::KeyIs(key) => codec::header_key(row)? == key.as_str(),
            HeaderFilter::KeyIn(keys) => {
                let key = codec::header_key(row)?;
                keys.iter().any(|candidate| candidate == key)
            }
            HeaderFilter::VersionAtLeast(lo) => codec::header_version(row)? >= *lo,
            HeaderFilter::VersionAtMost(hi) => codec::header_version(row)? <= *hi,
            HeaderFilter::VersionBetween(lo, hi) => {
                let version = codec::header_version(row)?;
                *lo <= version && version <= *hi
            }
        };
        Ok(verdict)
    }
}

/// Result order of a header query. Created-at orders tie-break on the key so
/// equal timestamps still come back deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOrder {
    ByKey,
    ByCreatedAt,
    ByCreatedAtDesc,
}

impl HeaderOrder {
    pub fn apply(self, rows: Vec<Row>) -> Result<Vec<Row>, DecodeError> {
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            let key = codec::header_key(&row)?.to_string();
            let created_at = codec::header_created_at(&row)?;
            keyed.push((created_at, key, row));
        }
        match self {
            HeaderOrder::ByKey => keyed.sort_by(|a, b| a.1.cmp(&b.1)),
            HeaderOrder::ByCreatedAt => keyed.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1))),
            HeaderOrder::ByCreatedAtDesc => keyed.sort_by(|a, b| (b.0, &b.1).cmp(&(a.0, &a.1))),
        }
        Ok(keyed.into_iter().map(|(_, _, row)| row).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderQuery {
    pub filter: HeaderFilter,
    pub order: HeaderOrder,
    pub limit: Option<usize>,
}

impl HeaderQuery {
    pub fn all() -> HeaderQuery {
        HeaderQuery { filter: HeaderFilter::All, order: HeaderOrder::ByKey, limit: None }
    }

    pub fn by_key(key: impl Into<String>) -> HeaderQuery {
        HeaderQuery { filter: HeaderFilter::KeyIs(key.into()), order: HeaderOrder::ByKey, limit: Some(1) }
    }

    pub fn by_keys(keys: Vec<String>) -> HeaderQuery {
        HeaderQuery { filter: HeaderFilter::KeyIn(keys), order: HeaderOrder::ByKey, limit: None }
    }

    pub fn version_window(lo: i64, hi: i64) -> HeaderQuery {
        HeaderQuery { filter: HeaderFilter::VersionBetween(lo, hi), order: HeaderOrder::ByKey, limit: None }
    }
}

/// Child rows for one key or a key set, always delivered ordered by
/// (header key, child index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildSelect {
    ForKey(String),
    ForKeys(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Headers(HeaderQuery),
    Children(ChildSelect),
    /// Highest persisted child index under the key as a single `Int` row,
    /// -1 when the header has no child rows.
    MaxChildIndex(String),
}

/// Minimal relational boundary the engine talks through.
///
/// Adapters hand out snapshot read transactions and RAII write transactions.
/// `commit` consumes the write transaction; dropping one without commit rolls
/// every staged statement back, so no error path can leave partial writes.
pub trait Store {
    type Read: ReadTx;
    type Write: WriteTx;

    fn begin_read(&self) -> Result<Self::Read, StoreError>;
    fn begin_write(&self) -> Result<Self::Write, StoreError>;
}

pub trait ReadTx {
    fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError>;
}

/// Write transactions also answer queries: `update` reads the persisted
/// child shape inside the transaction it writes in.
pub trait WriteTx: ReadTx {
    /// Executes one parameter row per entry, returning affected-row counts.
    fn execute_batch(&mut self, statement: Statement, rows: Vec<Row>) -> Result<Vec<usize>, StoreError>;

    fn commit(self) -> Result<(), StoreError>;
}

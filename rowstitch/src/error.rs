use std::sync::PoisonError;
use thiserror::Error;

/// A row that cannot be turned into a record. Carries the row kind and the
/// column name so a failing fetch points at the offending cell.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{row} row too short, column {column} missing")]
    Missing { row: &'static str, column: &'static str },

    #[error("required {row} column {column} is null")]
    Null { row: &'static str, column: &'static str },

    #[error("{row} column {column} holds {found}, expected {expected}")]
    Mismatch { row: &'static str, column: &'static str, expected: &'static str, found: &'static str },

    #[error("{row} column {column} is out of range")]
    OutOfRange { row: &'static str, column: &'static str },
}

/// Failure at the store boundary: constraint violations, lost backends,
/// payload codec trouble and the redb error family.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("no header row for child rows under key {0}")]
    MissingParent(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed stored row: {0}")]
    Malformed(#[from] DecodeError),

    #[error("row payload error: {0}")]
    Payload(#[from] bincode::Error),

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(e: PoisonError<T>) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Error out of an insert/update/delete. The write transaction is dropped on
/// every error path, so this always means the staged statements rolled back.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write rolled back: {0}")]
    Store(#[from] StoreError),

    #[error("write rolled back: {0}")]
    Decode(#[from] DecodeError),
}

/// Error out of a fetch. An absent key is not an error, `fetch_one` returns
/// `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch failed: {0}")]
    Store(#[from] StoreError),

    #[error("fetch failed: {0}")]
    Decode(#[from] DecodeError),
}

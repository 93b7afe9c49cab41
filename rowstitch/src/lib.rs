//! rowstitch persists header/line aggregates into two relational tables and
//! stitches them back together, keeping the line table's positional indices
//! dense and zero-based across every write.
//!
//! Writes batch per statement shape inside one transaction. Reads rebuild
//! aggregates from one header query plus at most one index-ordered line
//! query, whatever the result size.

pub mod codec;
pub mod error;
pub mod logger;
pub mod memory;
pub mod model;
pub mod plan;
pub mod reader;
pub mod redb_store;
pub mod report;
pub mod store;
pub mod writer;

pub use bigdecimal;
pub use bigdecimal::BigDecimal;
pub use chrono;
pub use chrono::{DateTime, NaiveDate, Utc};
pub use rand;
pub use redb;
pub use serde;

pub use error::{DecodeError, FetchError, StoreError, WriteError};
pub use memory::MemStore;
pub use model::{Invoice, LineItem};
pub use plan::ChildIndexPlan;
pub use reader::StitchReader;
pub use redb_store::RedbStore;
pub use report::{Report, ReportAssembler, ReportShape};
pub use store::{ChildSelect, HeaderFilter, HeaderOrder, HeaderQuery, Query, ReadTx, Row, Statement, Store, Value, WriteTx};
pub use writer::SyncWriter;

//! Embedded store adapter over redb.
//!
//! Header rows live under the invoice number, line rows under the composite
//! (number, index) key, so one range scan per key walks a child list in
//! index order. Row payloads are bincode-serialized `Row`s.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadTransaction, ReadableTable, Table, TableDefinition, WriteTransaction};

use crate::codec;
use crate::error::StoreError;
use crate::store::{ChildSelect, HeaderFilter, HeaderQuery, Query, ReadTx, Row, Statement, Store, Value, WriteTx};

const HEADERS: TableDefinition<&str, &[u8]> = TableDefinition::new("invoice");
const CHILDREN: TableDefinition<(&str, u32), &[u8]> = TableDefinition::new("invoice_line");

#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    pub fn open(path: impl AsRef<Path>) -> Result<RedbStore, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = RedbStore { db: Arc::new(Database::create(path)?) };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Temp-dir database with a random suffix, one per call.
    pub fn temp(name: &str) -> Result<RedbStore, StoreError> {
        RedbStore::open(env::temp_dir().join(format!("{}_{}.redb", name, rand::random::<u64>())))
    }

    /// Opens both tables once so later read transactions never see a
    /// database without them.
    fn ensure_tables(&self) -> Result<(), StoreError> {
        let tx = self.db.begin_write()?;
        tx.open_table(HEADERS)?;
        tx.open_table(CHILDREN)?;
        tx.commit()?;
        Ok(())
    }
}

impl Store for RedbStore {
    type Read = RedbReadTx;
    type Write = RedbWriteTx;

    fn begin_read(&self) -> Result<RedbReadTx, StoreError> {
        Ok(RedbReadTx { tx: self.db.begin_read()? })
    }

    fn begin_write(&self) -> Result<RedbWriteTx, StoreError> {
        Ok(RedbWriteTx { tx: self.db.begin_write()? })
    }
}

pub struct RedbReadTx {
    tx: ReadTransaction,
}

impl ReadTx for RedbReadTx {
    fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        match query {
            Query::Headers(header_query) => header_rows(&self.tx.open_table(HEADERS)?, header_query),
            Query::Children(select) => child_rows(&self.tx.open_table(CHILDREN)?, select),
            Query::MaxChildIndex(key) => max_index_row(&self.tx.open_table(CHILDREN)?, key),
        }
    }
}

/// Write transaction wrapper; redb rolls the transaction back when it is
/// dropped without commit.
pub struct RedbWriteTx {
    tx: WriteTransaction,
}

impl ReadTx for RedbWriteTx {
    fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        match query {
            Query::Headers(header_query) => header_rows(&self.tx.open_table(HEADERS)?, header_query),
            Query::Children(select) => child_rows(&self.tx.open_table(CHILDREN)?, select),
            Query::MaxChildIndex(key) => max_index_row(&self.tx.open_table(CHILDREN)?, key),
        }
    }
}

impl WriteTx for RedbWriteTx {
    fn execute_batch(&mut self, statement: Statement, rows: Vec<Row>) -> Result<Vec<usize>, StoreError> {
        match statement {
            Statement::InsertHeader => self.insert_headers(&rows),
            Statement::UpdateHeader => self.update_headers(&rows),
            Statement::InsertChild => self.insert_children(&rows),
            Statement::UpdateChild => self.update_children(&rows),
            Statement::DeleteChildrenFrom => self.delete_children_from(&rows),
            Statement::DeleteChildren => self.delete_children(&rows),
            Statement::DeleteHeader => self.delete_headers(&rows),
            Statement::DeleteAllChildren => self.clear_children(rows.len()),
            Statement::DeleteAllHeaders => self.clear_headers(rows.len()),
        }
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

impl RedbWriteTx {
    fn insert_headers(&self, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(HEADERS)?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let key = codec::header_key(row)?;
            if table.get(key)?.is_some() {
                return Err(StoreError::Duplicate(key.to_string()));
            }
            let payload = bincode::serialize(row)?;
            table.insert(key, payload.as_slice())?;
            counts.push(1);
        }
        Ok(counts)
    }

    fn update_headers(&self, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(HEADERS)?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let key = codec::update_header_key(row)?;
            let stored: Option<Row> = match table.get(key)? {
                Some(guard) => Some(bincode::deserialize(guard.value())?),
                None => None,
            };
            match stored {
                Some(old) => {
                    let payload = bincode::serialize(&codec::apply_header_update(&old, row)?)?;
                    table.insert(key, payload.as_slice())?;
                    counts.push(1);
                }
                None => counts.push(0),
            }
        }
        Ok(counts)
    }

    fn insert_children(&self, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let headers = self.tx.open_table(HEADERS)?;
        let mut table = self.tx.open_table(CHILDREN)?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let (key, index) = codec::child_locator(row)?;
            if headers.get(key)?.is_none() {
                return Err(StoreError::MissingParent(key.to_string()));
            }
            if table.get((key, index))?.is_some() {
                return Err(StoreError::Duplicate(format!("{key}/{index}")));
            }
            let payload = bincode::serialize(row)?;
            table.insert((key, index), payload.as_slice())?;
            counts.push(1);
        }
        Ok(counts)
    }

    fn update_children(&self, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(CHILDREN)?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let (key, index) = codec::update_child_locator(row)?;
            if table.get((key, index))?.is_none() {
                counts.push(0);
                continue;
            }
            let payload = bincode::serialize(&codec::child_row_from_update(row)?)?;
            table.insert((key, index), payload.as_slice())?;
            counts.push(1);
        }
        Ok(counts)
    }

    fn delete_children_from(&self, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(CHILDREN)?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let (key, from) = codec::delete_from_locator(row)?;
            counts.push(purge_children(&mut table, key, from)?);
        }
        Ok(counts)
    }

    fn delete_children(&self, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(CHILDREN)?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let key = codec::key_row(row)?;
            counts.push(purge_children(&mut table, key, 0)?);
        }
        Ok(counts)
    }

    fn delete_headers(&self, rows: &[Row]) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(HEADERS)?;
        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let key = codec::key_row(row)?;
            counts.push(usize::from(table.remove(key)?.is_some()));
        }
        Ok(counts)
    }

    fn clear_children(&self, row_count: usize) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(CHILDREN)?;
        let mut doomed = Vec::new();
        for entry in table.iter()? {
            let (guard, _) = entry?;
            let (key, index) = guard.value();
            doomed.push((key.to_string(), index));
        }
        for (key, index) in &doomed {
            table.remove((key.as_str(), *index))?;
        }
        Ok(vec![doomed.len(); row_count])
    }

    fn clear_headers(&self, row_count: usize) -> Result<Vec<usize>, StoreError> {
        let mut table = self.tx.open_table(HEADERS)?;
        let mut doomed = Vec::new();
        for entry in table.iter()? {
            let (guard, _) = entry?;
            doomed.push(guard.value().to_string());
        }
        for key in &doomed {
            table.remove(key.as_str())?;
        }
        Ok(vec![doomed.len(); row_count])
    }
}

fn purge_children(table: &mut Table<'_, (&'static str, u32), &'static [u8]>, key: &str, from: u32) -> Result<usize, StoreError> {
    let mut doomed = Vec::new();
    for entry in table.range((key, from)..=(key, u32::MAX))? {
        let (guard, _) = entry?;
        let (owner, index) = guard.value();
        doomed.push((owner.to_string(), index));
    }
    for (owner, index) in &doomed {
        table.remove((owner.as_str(), *index))?;
    }
    Ok(doomed.len())
}

fn header_rows(table: &impl ReadableTable<&'static str, &'static [u8]>, query: &HeaderQuery) -> Result<Vec<Row>, StoreError> {
    // point lookup, no scan
    if let HeaderFilter::KeyIs(key) = &query.filter {
        return Ok(match table.get(key.as_str())? {
            Some(guard) => vec![bincode::deserialize(guard.value())?],
            None => Vec::new(),
        });
    }
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_, guard) = entry?;
        let row: Row = bincode::deserialize(guard.value())?;
        if query.filter.matches(&row)? {
            rows.push(row);
        }
    }
    let mut rows = query.order.apply(rows)?;
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    Ok(rows)
}

fn child_rows(table: &impl ReadableTable<(&'static str, u32), &'static [u8]>, select: &ChildSelect) -> Result<Vec<Row>, StoreError> {
    let mut keys: Vec<&str> = match select {
        ChildSelect::ForKey(key) => vec![key.as_str()],
        ChildSelect::ForKeys(keys) => keys.iter().map(String::as_str).collect(),
    };
    keys.sort_unstable();
    keys.dedup();
    let mut rows = Vec::new();
    for key in keys {
        for entry in table.range((key, 0)..=(key, u32::MAX))? {
            let (_, guard) = entry?;
            rows.push(bincode::deserialize(guard.value())?);
        }
    }
    Ok(rows)
}

fn max_index_row(table: &impl ReadableTable<(&'static str, u32), &'static [u8]>, key: &str) -> Result<Vec<Row>, StoreError> {
    let max = match table.range((key, 0)..=(key, u32::MAX))?.next_back() {
        Some(entry) => i64::from(entry?.0.value().1),
        None => -1,
    };
    Ok(vec![vec![Value::Int(max)]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::{DateTime, NaiveDate};

    // bincode is not self-describing, so every cell kind must deserialize
    // without deserialize_any; decimals ride as strings for that reason.
    #[test]
    fn it_should_round_trip_every_cell_kind_through_the_row_payload() {
        let row: Row = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(-7),
            Value::Text("7".to_string()),
            Value::Decimal(BigDecimal::new(12_345.into(), 2)),
            Value::Date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()),
            Value::Timestamp(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
        ];
        let payload = bincode::serialize(&row).expect("Failed to serialize row");
        let decoded: Row = bincode::deserialize(&payload).expect("Failed to deserialize row");
        assert_eq!(decoded, row);
    }

    #[test]
    fn it_should_store_and_read_back_a_decimal_cell() {
        let store = RedbStore::temp("rowstitch_payload").expect("Failed to open store");
        let mut tx = store.begin_write().expect("Failed to begin write");
        let row = vec![
            Value::Text("1".to_string()),
            Value::Date(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()),
            Value::Decimal(BigDecimal::new(999.into(), 2)),
            Value::Null,
            Value::Bool(false),
            Value::Int(1),
            Value::Decimal(BigDecimal::from(15)),
            Value::Null,
            Value::Timestamp(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
            Value::Timestamp(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
        ];
        tx.execute_batch(Statement::InsertHeader, vec![row.clone()]).expect("Failed to insert");
        tx.commit().expect("Failed to commit");

        let read = store.begin_read().expect("Failed to begin read");
        let rows = read
            .query(&Query::Headers(HeaderQuery::by_key("1")))
            .expect("Failed to query header");
        assert_eq!(rows, vec![row]);
    }
}

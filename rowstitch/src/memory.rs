//! In-memory store adapter, the reference semantics for the statement menu.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use crate::codec;
use crate::error::StoreError;
use crate::store::{ChildSelect, HeaderQuery, Query, ReadTx, Row, Statement, Store, Value, WriteTx};

#[derive(Debug, Clone, Default)]
struct Tables {
    headers: BTreeMap<String, Row>,
    children: BTreeMap<(String, u32), Row>,
}

/// Header rows keyed by number, line rows keyed by (number, index), both in
/// ordered maps so range scans come back sorted for free.
#[derive(Clone, Default)]
pub struct MemStore {
    shared: Arc<Mutex<Tables>>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }
}

impl Store for MemStore {
    type Read = MemSnapshot;
    type Write = MemWriteTx;

    fn begin_read(&self) -> Result<MemSnapshot, StoreError> {
        Ok(MemSnapshot { tables: self.shared.lock()?.clone() })
    }

    fn begin_write(&self) -> Result<MemWriteTx, StoreError> {
        let work = self.shared.lock()?.clone();
        Ok(MemWriteTx { shared: Arc::clone(&self.shared), work })
    }
}

pub struct MemSnapshot {
    tables: Tables,
}

impl ReadTx for MemSnapshot {
    fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        run_query(&self.tables, query)
    }
}

/// Copy-on-write transaction: statements run against a private copy,
/// `commit` swaps it in, dropping the transaction discards it.
pub struct MemWriteTx {
    shared: Arc<Mutex<Tables>>,
    work: Tables,
}

impl ReadTx for MemWriteTx {
    fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        run_query(&self.work, query)
    }
}

impl WriteTx for MemWriteTx {
    fn execute_batch(&mut self, statement: Statement, rows: Vec<Row>) -> Result<Vec<usize>, StoreError> {
        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            counts.push(self.apply(statement, row)?);
        }
        Ok(counts)
    }

    fn commit(self) -> Result<(), StoreError> {
        *self.shared.lock()? = self.work;
        Ok(())
    }
}

impl MemWriteTx {
    fn apply(&mut self, statement: Statement, row: &Row) -> Result<usize, StoreError> {
        match statement {
            Statement::InsertHeader => {
                let key = codec::header_key(row)?.to_string();
                if self.work.headers.contains_key(&key) {
                    return Err(StoreError::Duplicate(key));
                }
                self.work.headers.insert(key, row.clone());
                Ok(1)
            }
            Statement::UpdateHeader => {
                let key = codec::update_header_key(row)?.to_string();
                let merged = match self.work.headers.get(&key) {
                    Some(stored) => codec::apply_header_update(stored, row)?,
                    None => return Ok(0),
                };
                self.work.headers.insert(key, merged);
                Ok(1)
            }
            Statement::InsertChild => {
                let (key, index) = codec::child_locator(row)?;
                if !self.work.headers.contains_key(key) {
                    return Err(StoreError::MissingParent(key.to_string()));
                }
                let slot = (key.to_string(), index);
                if self.work.children.contains_key(&slot) {
                    return Err(StoreError::Duplicate(format!("{key}/{index}")));
                }
                self.work.children.insert(slot, row.clone());
                Ok(1)
            }
            Statement::UpdateChild => {
                let (key, index) = codec::update_child_locator(row)?;
                let slot = (key.to_string(), index);
                if !self.work.children.contains_key(&slot) {
                    return Ok(0);
                }
                self.work.children.insert(slot, codec::child_row_from_update(row)?);
                Ok(1)
            }
            Statement::DeleteChildrenFrom => {
                let (key, from) = codec::delete_from_locator(row)?;
                Ok(self.purge_children(key, from))
            }
            Statement::DeleteChildren => {
                let key = codec::key_row(row)?;
                Ok(self.purge_children(key, 0))
            }
            Statement::DeleteHeader => {
                let key = codec::key_row(row)?;
                Ok(usize::from(self.work.headers.remove(key).is_some()))
            }
            Statement::DeleteAllChildren => {
                let count = self.work.children.len();
                self.work.children.clear();
                Ok(count)
            }
            Statement::DeleteAllHeaders => {
                let count = self.work.headers.len();
                self.work.headers.clear();
                Ok(count)
            }
        }
    }

    fn purge_children(&mut self, key: &str, from: u32) -> usize {
        let doomed: Vec<(String, u32)> =
            self.work.children.range(child_range(key, from)).map(|(slot, _)| slot.clone()).collect();
        for slot in &doomed {
            self.work.children.remove(slot);
        }
        doomed.len()
    }
}

fn child_range(key: &str, from: u32) -> RangeInclusive<(String, u32)> {
    (key.to_string(), from)..=(key.to_string(), u32::MAX)
}

fn run_query(tables: &Tables, query: &Query) -> Result<Vec<Row>, StoreError> {
    match query {
        Query::Headers(header_query) => header_rows(tables, header_query),
        Query::Children(select) => Ok(child_rows(tables, select)),
        Query::MaxChildIndex(key) => {
            let max = tables
                .children
                .range(child_range(key, 0))
                .next_back()
                .map_or(-1, |((_, index), _)| i64::from(*index));
            Ok(vec![vec![Value::Int(max)]])
        }
    }
}

fn header_rows(tables: &Tables, query: &HeaderQuery) -> Result<Vec<Row>, StoreError> {
    let mut rows = Vec::new();
    for row in tables.headers.values() {
        if query.filter.matches(row)? {
            rows.push(row.clone());
        }
    }
    let mut rows = query.order.apply(rows)?;
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    Ok(rows)
}

fn child_rows(tables: &Tables, select: &ChildSelect) -> Vec<Row> {
    let mut keys: Vec<&str> = match select {
        ChildSelect::ForKey(key) => vec![key.as_str()],
        ChildSelect::ForKeys(keys) => keys.iter().map(String::as_str).collect(),
    };
    keys.sort_unstable();
    keys.dedup();
    let mut rows = Vec::new();
    for key in keys {
        rows.extend(tables.children.range(child_range(key, 0)).map(|(_, row)| row.clone()));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Invoice, LineItem};
    use bigdecimal::BigDecimal;
    use chrono::{DateTime, NaiveDate};

    fn invoice(number: &str) -> Invoice {
        let created_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        Invoice {
            number: number.to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            total: BigDecimal::from(100),
            paid: None,
            canceled: false,
            version: 1,
            tax: BigDecimal::from(15),
            reference: None,
            created_at,
            modified_at: created_at,
            lines: Vec::new(),
        }
    }

    fn item(product: &str) -> LineItem {
        LineItem {
            product: product.to_string(),
            cost: BigDecimal::from(9),
            quantity: 1,
            tax_group: BigDecimal::from(5),
            discount: BigDecimal::from(0),
        }
    }

    fn seed(store: &MemStore, number: &str, line_count: u32) {
        let mut tx = store.begin_write().expect("Failed to begin write");
        tx.execute_batch(Statement::InsertHeader, vec![codec::encode_header(&invoice(number))])
            .expect("Failed to insert header");
        for index in 0..line_count {
            tx.execute_batch(Statement::InsertChild, vec![codec::encode_child(number, index, &item("p"))])
                .expect("Failed to insert child");
        }
        tx.commit().expect("Failed to commit");
    }

    fn max_index(store: &MemStore, number: &str) -> i64 {
        let tx = store.begin_read().expect("Failed to begin read");
        let rows = tx.query(&Query::MaxChildIndex(number.to_string())).expect("Failed to query max index");
        codec::decode_max_index(&rows).expect("Failed to decode max index")
    }

    #[test]
    fn it_should_discard_a_dropped_transaction_and_keep_a_committed_one() {
        let store = MemStore::new();
        {
            let mut tx = store.begin_write().expect("Failed to begin write");
            tx.execute_batch(Statement::InsertHeader, vec![codec::encode_header(&invoice("1"))])
                .expect("Failed to insert header");
        }
        let tx = store.begin_read().expect("Failed to begin read");
        assert!(tx.query(&Query::Headers(HeaderQuery::by_key("1"))).expect("Failed to query").is_empty());

        seed(&store, "1", 0);
        let tx = store.begin_read().expect("Failed to begin read");
        assert_eq!(tx.query(&Query::Headers(HeaderQuery::by_key("1"))).expect("Failed to query").len(), 1);
    }

    #[test]
    fn it_should_reject_a_duplicate_header_key() {
        let store = MemStore::new();
        seed(&store, "1", 0);
        let mut tx = store.begin_write().expect("Failed to begin write");
        let err = tx
            .execute_batch(Statement::InsertHeader, vec![codec::encode_header(&invoice("1"))])
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(key) if key == "1"));
    }

    #[test]
    fn it_should_require_the_owning_header_for_a_line_row() {
        let store = MemStore::new();
        let mut tx = store.begin_write().expect("Failed to begin write");
        let err = tx
            .execute_batch(Statement::InsertChild, vec![codec::encode_child("missing", 0, &item("p"))])
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingParent(key) if key == "missing"));
    }

    #[test]
    fn it_should_report_minus_one_and_then_the_highest_persisted_index() {
        let store = MemStore::new();
        seed(&store, "7", 0);
        assert_eq!(max_index(&store, "7"), -1);
        seed(&store, "8", 3);
        assert_eq!(max_index(&store, "8"), 2);
        assert_eq!(max_index(&store, "7"), -1);
    }

    #[test]
    fn it_should_delete_the_tail_from_an_index_and_count_the_victims() {
        let store = MemStore::new();
        seed(&store, "7", 5);
        let mut tx = store.begin_write().expect("Failed to begin write");
        let counts = tx
            .execute_batch(Statement::DeleteChildrenFrom, vec![codec::encode_delete_from("7", 2)])
            .expect("Failed to delete tail");
        assert_eq!(counts, vec![3]);
        tx.commit().expect("Failed to commit");
        assert_eq!(max_index(&store, "7"), 1);
    }

    #[test]
    fn it_should_affect_zero_rows_when_updating_something_absent() {
        let store = MemStore::new();
        let mut tx = store.begin_write().expect("Failed to begin write");
        let counts = tx
            .execute_batch(Statement::UpdateHeader, vec![codec::encode_header_update(&invoice("ghost"))])
            .expect("Failed to run update");
        assert_eq!(counts, vec![0]);
    }

    #[test]
    fn it_should_scan_children_of_a_key_set_ordered_by_key_and_index() {
        let store = MemStore::new();
        seed(&store, "2", 2);
        seed(&store, "1", 1);
        let tx = store.begin_read().expect("Failed to begin read");
        let select = ChildSelect::ForKeys(vec!["2".to_string(), "1".to_string(), "2".to_string()]);
        let rows = tx.query(&Query::Children(select)).expect("Failed to query children");
        let locators: Vec<(String, u32)> = rows
            .iter()
            .map(|row| codec::child_locator(row).map(|(key, index)| (key.to_string(), index)))
            .collect::<Result<_, _>>()
            .expect("Failed to decode locators");
        assert_eq!(
            locators,
            vec![("1".to_string(), 0), ("2".to_string(), 0), ("2".to_string(), 1)]
        );
    }
}

//! Write-side persistence of whole aggregates.

use chrono::Utc;

use crate::codec;
use crate::error::WriteError;
use crate::model::Invoice;
use crate::plan::ChildIndexPlan;
use crate::store::{Query, ReadTx, Row, Statement, Store, WriteTx};

/// Persists invoices atomically, header and line rows inside one write
/// transaction per call. Errors roll the whole transaction back.
pub struct SyncWriter<S: Store> {
    store: S,
}

impl<S: Store> SyncWriter<S> {
    pub fn new(store: S) -> SyncWriter<S> {
        SyncWriter { store }
    }

    /// Inserts brand-new aggregates. Line rows get indices straight from
    /// their list position. Fails on an already persisted number.
    pub fn insert(&self, invoices: &[Invoice]) -> Result<(), WriteError> {
        if invoices.is_empty() {
            return Ok(());
        }
        let mut headers = Vec::with_capacity(invoices.len());
        let mut children = Vec::new();
        for invoice in invoices {
            headers.push(codec::encode_header(invoice));
            for (position, item) in invoice.lines.iter().enumerate() {
                children.push(codec::encode_child(&invoice.number, position as u32, item));
            }
        }
        let mut tx = self.store.begin_write()?;
        tx.execute_batch(Statement::InsertHeader, headers)?;
        if !children.is_empty() {
            tx.execute_batch(Statement::InsertChild, children)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_one(&self, invoice: &Invoice) -> Result<(), WriteError> {
        self.insert(std::slice::from_ref(invoice))
    }

    /// Rewrites persisted aggregates to match the in-memory ones and stamps
    /// `modified_at` on every argument with one shared timestamp.
    ///
    /// The persisted line shape is reconciled per aggregate: the stored max
    /// index is read inside the same transaction, the overlap with the new
    /// list is updated in place, surplus positions are inserted and a
    /// shrunken tail is deleted in one statement. Batches that end up with
    /// no parameter rows are not executed at all.
    pub fn update(&self, invoices: &mut [Invoice]) -> Result<(), WriteError> {
        if invoices.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut tx = self.store.begin_write()?;
        let mut header_updates = Vec::with_capacity(invoices.len());
        let mut child_updates = Vec::new();
        let mut child_inserts = Vec::new();
        let mut tail_deletes = Vec::new();
        for invoice in invoices.iter_mut() {
            let result = tx.query(&Query::MaxChildIndex(invoice.number.clone()))?;
            let old_max = codec::decode_max_index(&result)?;
            let ChildIndexPlan { updates, inserts, delete_from } =
                ChildIndexPlan::compute(old_max, invoice.lines.len());
            invoice.modified_at = now;
            header_updates.push(codec::encode_header_update(invoice));
            for index in updates {
                child_updates.push(codec::encode_child_update(&invoice.number, index, &invoice.lines[index as usize]));
            }
            for index in inserts {
                child_inserts.push(codec::encode_child(&invoice.number, index, &invoice.lines[index as usize]));
            }
            if let Some(from) = delete_from {
                tail_deletes.push(codec::encode_delete_from(&invoice.number, from));
            }
        }
        tx.execute_batch(Statement::UpdateHeader, header_updates)?;
        if !child_updates.is_empty() {
            tx.execute_batch(Statement::UpdateChild, child_updates)?;
        }
        if !child_inserts.is_empty() {
            tx.execute_batch(Statement::InsertChild, child_inserts)?;
        }
        if !tail_deletes.is_empty() {
            tx.execute_batch(Statement::DeleteChildrenFrom, tail_deletes)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn update_one(&self, invoice: &mut Invoice) -> Result<(), WriteError> {
        self.update(std::slice::from_mut(invoice))
    }

    /// Deletes the aggregates under `keys`, line rows before headers.
    /// Unknown keys delete nothing and raise nothing.
    pub fn delete(&self, keys: &[String]) -> Result<(), WriteError> {
        if keys.is_empty() {
            return Ok(());
        }
        let rows: Vec<Row> = keys.iter().map(|key| codec::encode_key(key)).collect();
        let mut tx = self.store.begin_write()?;
        tx.execute_batch(Statement::DeleteChildren, rows.clone())?;
        tx.execute_batch(Statement::DeleteHeader, rows)?;
        tx.commit()?;
        Ok(())
    }

    /// Empties both tables.
    pub fn delete_all(&self) -> Result<(), WriteError> {
        let mut tx = self.store.begin_write()?;
        tx.execute_batch(Statement::DeleteAllChildren, vec![Vec::new()])?;
        tx.execute_batch(Statement::DeleteAllHeaders, vec![Vec::new()])?;
        tx.commit()?;
        Ok(())
    }
}

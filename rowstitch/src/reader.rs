//! Read-side stitching of header and line rows back into whole aggregates.

use std::collections::HashMap;

use crate::codec;
use crate::error::FetchError;
use crate::model::Invoice;
use crate::store::{ChildSelect, HeaderQuery, Query, ReadTx, Store};
use crate::warn;

/// Rebuilds invoices from their two tables. Every fetch runs on a single
/// read snapshot, so headers and lines can never disagree about a commit.
pub struct StitchReader<S: Store> {
    store: S,
}

impl<S: Store> StitchReader<S> {
    pub fn new(store: S) -> StitchReader<S> {
        StitchReader { store }
    }

    /// Fetches one aggregate by its number, lines restored in index order.
    pub fn fetch_one(&self, key: &str) -> Result<Option<Invoice>, FetchError> {
        let tx = self.store.begin_read()?;
        let headers = tx.query(&Query::Headers(HeaderQuery::by_key(key)))?;
        let Some(header) = headers.first() else {
            return Ok(None);
        };
        let mut invoice = codec::decode_header(header)?;
        let children = tx.query(&Query::Children(ChildSelect::ForKey(key.to_string())))?;
        for row in &children {
            let (owner, _, item) = codec::decode_child(row)?;
            if owner != invoice.number {
                warn!("line row of {} answered a query for {}, dropping it", owner, invoice.number);
                continue;
            }
            invoice.lines.push(item);
        }
        Ok(Some(invoice))
    }

    /// Fetches every aggregate the header query selects with one header
    /// query plus at most one line query, preserving the header order.
    ///
    /// Line rows arrive ordered by (key, index) and are routed to their
    /// owners by key; a row without an owner in the result set is dropped
    /// with a warning rather than failing the whole fetch.
    pub fn fetch_many(&self, query: HeaderQuery) -> Result<Vec<Invoice>, FetchError> {
        let tx = self.store.begin_read()?;
        let headers = tx.query(&Query::Headers(query))?;
        let mut order = Vec::with_capacity(headers.len());
        let mut staged: HashMap<String, Invoice> = HashMap::with_capacity(headers.len());
        for row in &headers {
            let invoice = codec::decode_header(row)?;
            order.push(invoice.number.clone());
            staged.insert(invoice.number.clone(), invoice);
        }
        if !order.is_empty() {
            let children = tx.query(&Query::Children(ChildSelect::ForKeys(order.clone())))?;
            for row in &children {
                let (owner, _, item) = codec::decode_child(row)?;
                match staged.get_mut(&owner) {
                    Some(invoice) => invoice.lines.push(item),
                    None => warn!("line row of {} has no header in the result set, dropping it", owner),
                }
            }
        }
        Ok(order.iter().filter_map(|key| staged.remove(key)).collect())
    }

    pub fn fetch_keys(&self, keys: &[String]) -> Result<Vec<Invoice>, FetchError> {
        self.fetch_many(HeaderQuery::by_keys(keys.to_vec()))
    }
}

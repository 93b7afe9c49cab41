//! Fixed menu of read shapes layered over the stitch reader.

use crate::error::FetchError;
use crate::model::Invoice;
use crate::reader::StitchReader;
use crate::store::{HeaderFilter, HeaderOrder, HeaderQuery, Store};

/// The six read patterns, selectable by discriminator. Each is nothing but a
/// header query shape; the stitching itself never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportShape {
    /// Exact-key lookup.
    One(String),
    /// Lookup of a fixed key set.
    Many(Vec<String>),
    /// Oldest invoice with `version >= bound`.
    FirstSince(i64),
    /// Newest invoice with `version <= bound`.
    LastUntil(i64),
    /// Five oldest invoices with version in `[lo, hi]`.
    TopInWindow(i64, i64),
    /// Ten newest invoices with version in `[lo, hi]`.
    BottomInWindow(i64, i64),
}

impl ReportShape {
    fn query(&self) -> HeaderQuery {
        match self {
            ReportShape::One(key) => HeaderQuery::by_key(key.clone()),
            ReportShape::Many(keys) => HeaderQuery::by_keys(keys.clone()),
            ReportShape::FirstSince(bound) => HeaderQuery {
                filter: HeaderFilter::VersionAtLeast(*bound),
                order: HeaderOrder::ByCreatedAt,
                limit: Some(1),
            },
            ReportShape::LastUntil(bound) => HeaderQuery {
                filter: HeaderFilter::VersionAtMost(*bound),
                order: HeaderOrder::ByCreatedAtDesc,
                limit: Some(1),
            },
            ReportShape::TopInWindow(lo, hi) => HeaderQuery {
                filter: HeaderFilter::VersionBetween(*lo, *hi),
                order: HeaderOrder::ByCreatedAt,
                limit: Some(5),
            },
            ReportShape::BottomInWindow(lo, hi) => HeaderQuery {
                filter: HeaderFilter::VersionBetween(*lo, *hi),
                order: HeaderOrder::ByCreatedAtDesc,
                limit: Some(10),
            },
        }
    }
}

/// One result per shape, collected by [`ReportAssembler::assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub one: Option<Invoice>,
    pub many: Vec<Invoice>,
    pub first: Option<Invoice>,
    pub last: Option<Invoice>,
    pub top: Vec<Invoice>,
    pub bottom: Vec<Invoice>,
}

pub struct ReportAssembler<S: Store> {
    reader: StitchReader<S>,
}

impl<S: Store> ReportAssembler<S> {
    pub fn new(store: S) -> ReportAssembler<S> {
        ReportAssembler { reader: StitchReader::new(store) }
    }

    pub fn fetch(&self, shape: &ReportShape) -> Result<Vec<Invoice>, FetchError> {
        self.reader.fetch_many(shape.query())
    }

    /// Runs all six shapes against the same store: `key` feeds the exact
    /// lookup, `keys` the set lookup, `lo`/`hi` every version bound.
    pub fn assemble(&self, key: &str, keys: &[String], lo: i64, hi: i64) -> Result<Report, FetchError> {
        let one = self.fetch(&ReportShape::One(key.to_string()))?.into_iter().next();
        let many = self.fetch(&ReportShape::Many(keys.to_vec()))?;
        let first = self.fetch(&ReportShape::FirstSince(lo))?.into_iter().next();
        let last = self.fetch(&ReportShape::LastUntil(hi))?.into_iter().next();
        let top = self.fetch(&ReportShape::TopInWindow(lo, hi))?;
        let bottom = self.fetch(&ReportShape::BottomInWindow(lo, hi))?;
        Ok(Report { one, many, first, last, top, bottom })
    }
}

//! In-process transport over roaring bitmaps.
//!
//! Holds `index -> collection -> row -> columns` and evaluates query trees
//! the way a server would. Used for fixtures and for exercising callers
//! without a running server; nothing is persisted.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use parking_lot::RwLock;
use roaring::RoaringTreemap;

use crate::error::TransportError;
use crate::query::Query;
use crate::response::{BitmapResult, CountItem, QueryResponse, QueryResult};
use crate::schema::Schema;
use crate::transport::{QueryOptions, Transport};

type Rows = BTreeMap<u64, RoaringTreemap>;

#[derive(Debug, Default)]
struct MemoryState {
    indexes: BTreeMap<String, BTreeMap<String, Rows>>,
}

fn not_found(message: String) -> TransportError {
    TransportError::Server {
        status: 404,
        message,
    }
}

fn bad_query(message: String) -> TransportError {
    TransportError::Server {
        status: 400,
        message,
    }
}

impl MemoryState {
    fn rows(&self, index: &str, collection: &str) -> Result<&Rows, TransportError> {
        self.indexes
            .get(index)
            .ok_or_else(|| not_found(format!("index not found: {index}")))?
            .get(collection)
            .ok_or_else(|| not_found(format!("frame not found: {index}/{collection}")))
    }

    fn rows_mut(&mut self, index: &str, collection: &str) -> Result<&mut Rows, TransportError> {
        self.indexes
            .get_mut(index)
            .ok_or_else(|| not_found(format!("index not found: {index}")))?
            .get_mut(collection)
            .ok_or_else(|| not_found(format!("frame not found: {index}/{collection}")))
    }

    fn bitmap(&self, index: &str, query: &Query) -> Result<RoaringTreemap, TransportError> {
        match query {
            Query::Bitmap { collection, row_id } => Ok(self
                .rows(index, collection.name())?
                .get(row_id)
                .cloned()
                .unwrap_or_default()),
            Query::Intersect(children) => {
                let (first, rest) = split_children("Intersect", children)?;
                let mut acc = self.bitmap(index, first)?;
                for child in rest {
                    acc &= self.bitmap(index, child)?;
                }
                Ok(acc)
            }
            Query::Union(children) => {
                let (first, rest) = split_children("Union", children)?;
                let mut acc = self.bitmap(index, first)?;
                for child in rest {
                    acc |= self.bitmap(index, child)?;
                }
                Ok(acc)
            }
            Query::Difference(children) => {
                let (first, rest) = split_children("Difference", children)?;
                let mut acc = self.bitmap(index, first)?;
                for child in rest {
                    acc -= self.bitmap(index, child)?;
                }
                Ok(acc)
            }
            other => Err(bad_query(format!("{other} does not produce a bitmap"))),
        }
    }

    fn top_n(
        &self,
        index: &str,
        collection: &str,
        n: u64,
        filter: Option<&Query>,
    ) -> Result<Vec<CountItem>, TransportError> {
        let filter = filter.map(|f| self.bitmap(index, f)).transpose()?;
        let mut items: Vec<CountItem> = self
            .rows(index, collection)?
            .iter()
            .map(|(&id, columns)| {
                let count = match &filter {
                    Some(f) => (columns & f).len(),
                    None => columns.len(),
                };
                CountItem { id, count }
            })
            .filter(|item| item.count > 0)
            .collect();
        items.sort_by_key(|item| (Reverse(item.count), item.id));
        items.truncate(usize::try_from(n).unwrap_or(usize::MAX));
        Ok(items)
    }
}

fn split_children<'a>(
    op: &str,
    children: &'a [Query],
) -> Result<(&'a Query, &'a [Query]), TransportError> {
    children
        .split_first()
        .ok_or_else(|| bad_query(format!("{op} requires at least one child query")))
}

/// Bitmap index held in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: RwLock<MemoryState>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection (and its index) if missing.
    pub fn create_collection(&self, index: &str, collection: &str) {
        self.state
            .write()
            .indexes
            .entry(index.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
    }

    /// Set `columns` under `row`, creating the collection if needed.
    pub fn set_bits(
        &self,
        index: &str,
        collection: &str,
        row: u64,
        columns: impl IntoIterator<Item = u64>,
    ) {
        let mut state = self.state.write();
        let rows = state
            .indexes
            .entry(index.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();
        rows.entry(row).or_default().extend(columns);
    }

    /// Builder form of [`MemoryTransport::set_bits`] for fixtures.
    pub fn with_bits(
        self,
        index: &str,
        collection: &str,
        row: u64,
        columns: impl IntoIterator<Item = u64>,
    ) -> Self {
        self.set_bits(index, collection, row, columns);
        self
    }

    fn mutate(&self, index: &str, query: &Query) -> Result<bool, TransportError> {
        let mut state = self.state.write();
        match query {
            Query::SetBit {
                collection,
                row_id,
                column_id,
            } => Ok(state
                .rows_mut(index, collection.name())?
                .entry(*row_id)
                .or_default()
                .insert(*column_id)),
            Query::ClearBit {
                collection,
                row_id,
                column_id,
            } => {
                let rows = state.rows_mut(index, collection.name())?;
                let changed = rows
                    .get_mut(row_id)
                    .is_some_and(|columns| columns.remove(*column_id));
                if rows.get(row_id).is_some_and(|columns| columns.is_empty()) {
                    rows.remove(row_id);
                }
                Ok(changed)
            }
            other => Err(bad_query(format!("{other} is not a mutation"))),
        }
    }
}

impl Transport for MemoryTransport {
    fn query(
        &self,
        index: &str,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<QueryResponse, TransportError> {
        if query.is_mutation() {
            return Ok(QueryResponse::new(QueryResult::Changed(
                self.mutate(index, query)?,
            )));
        }

        let state = self.state.read();
        let result = match query {
            Query::Count(child) => QueryResult::Count(state.bitmap(index, child)?.len()),
            Query::TopN {
                collection,
                n,
                filter,
            } => QueryResult::CountItems(state.top_n(
                index,
                collection.name(),
                *n,
                filter.as_deref(),
            )?),
            bitmap_query => {
                let bits = if options.exclude_bits {
                    // Still evaluated so unknown collections are reported.
                    state.bitmap(index, bitmap_query)?;
                    RoaringTreemap::new()
                } else {
                    state.bitmap(index, bitmap_query)?
                };
                QueryResult::Bitmap(BitmapResult {
                    bits: bits.into(),
                    attributes: Default::default(),
                })
            }
        };
        Ok(QueryResponse::new(result))
    }

    fn schema(&self) -> Result<Schema, TransportError> {
        let state = self.state.read();
        let mut schema = Schema::new();
        for (index, collections) in &state.indexes {
            for collection in collections.keys() {
                schema.add(index, collection);
            }
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Index;

    #[test]
    fn test_top_n_tie_break_and_filter() {
        let transport = MemoryTransport::new()
            .with_bits("repository", "language", 2, [1, 2])
            .with_bits("repository", "language", 1, [3, 4])
            .with_bits("repository", "language", 0, [5, 6, 7])
            .with_bits("repository", "stargazer", 9, [1, 3, 5]);
        let repo = Index::new("repository").unwrap();
        let language = repo.collection("language").unwrap();
        let stargazer = repo.collection("stargazer").unwrap();

        let resp = transport
            .query("repository", &language.top_n(10), &QueryOptions::default())
            .unwrap();
        let ids: Vec<(u64, u64)> = resp
            .as_count_items()
            .unwrap()
            .iter()
            .map(|i| (i.id, i.count))
            .collect();
        assert_eq!(ids, vec![(0, 3), (1, 2), (2, 2)]);

        let filtered = language.filtered_top_n(2, stargazer.bitmap(9)).unwrap();
        let resp = transport
            .query("repository", &filtered, &QueryOptions::default())
            .unwrap();
        let ids: Vec<u64> = resp.as_count_items().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_unknown_index_and_collection() {
        let transport = MemoryTransport::new().with_bits("repository", "stargazer", 1, [1]);
        let other = Index::new("other").unwrap().collection("stargazer").unwrap();
        let err = transport
            .query("other", &other.bitmap(1), &QueryOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::Server { status: 404, .. }));

        let missing = Index::new("repository").unwrap().collection("missing").unwrap();
        let err = transport
            .query("repository", &missing.set_bit(1, 1), &QueryOptions::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::Server { status: 404, .. }));
    }

    #[test]
    fn test_unknown_collection_reported_in_any_order() {
        let transport = MemoryTransport::new().with_bits("repository", "stargazer", 1, [7]);
        let repo = Index::new("repository").unwrap();
        let stargazer = repo.collection("stargazer").unwrap();
        let missing = repo.collection("missing").unwrap();
        let opts = QueryOptions::default();

        for children in [
            [stargazer.bitmap(2), missing.bitmap(1)],
            [missing.bitmap(1), stargazer.bitmap(2)],
        ] {
            let q = Query::intersect(children).unwrap();
            let err = transport.query("repository", &q, &opts).unwrap_err();
            assert!(matches!(err, TransportError::Server { status: 404, .. }));
        }
    }

    #[test]
    fn test_clear_bit_reports_change() {
        let transport = MemoryTransport::new().with_bits("repository", "stargazer", 1, [7]);
        let stargazer = Index::new("repository")
            .unwrap()
            .collection("stargazer")
            .unwrap();
        let opts = QueryOptions::default();

        let first = transport
            .query("repository", &stargazer.clear_bit(1, 7), &opts)
            .unwrap();
        assert!(first.as_changed().unwrap());
        let second = transport
            .query("repository", &stargazer.clear_bit(1, 7), &opts)
            .unwrap();
        assert!(!second.as_changed().unwrap());

        let top = transport
            .query("repository", &stargazer.top_n(5), &opts)
            .unwrap();
        assert!(top.as_count_items().unwrap().is_empty());
    }

    #[test]
    fn test_exclude_bits() {
        let transport = MemoryTransport::new().with_bits("repository", "stargazer", 1, [7]);
        let stargazer = Index::new("repository")
            .unwrap()
            .collection("stargazer")
            .unwrap();
        let opts = QueryOptions {
            exclude_bits: true,
            ..QueryOptions::default()
        };
        let resp = transport
            .query("repository", &stargazer.bitmap(1), &opts)
            .unwrap();
        assert!(resp.as_bitmap().unwrap().bits.is_empty());
    }

    #[test]
    fn test_schema_lists_collections() {
        let transport = MemoryTransport::new()
            .with_bits("repository", "stargazer", 1, [1])
            .with_bits("repository", "language", 1, [1]);
        transport.create_collection("empty-index", "frame");
        let schema = transport.schema().unwrap();
        assert!(schema.has_collection("repository", "stargazer"));
        assert!(schema.has_collection("repository", "language"));
        assert!(schema.has_collection("empty-index", "frame"));
    }
}

//! The query facade: build, execute, decode.
//!
//! Building is pure and never touches the transport. `execute` is the only
//! call that performs I/O; it blocks until the transport answers and wraps
//! any failure with the query text and index. Decoding checks the result
//! shape and never coerces one shape into another.

use crate::bitset::BitSet;
use crate::error::{BuildError, DecodeError, QueryError};
use crate::query::Query;
use crate::response::{CountItem, QueryResponse};
use crate::schema::Collection;
use crate::transport::{QueryOptions, Transport};

pub fn fetch_bitmap(collection: &Collection, row_id: u64) -> Query {
    collection.bitmap(row_id)
}

pub fn intersect(queries: impl IntoIterator<Item = Query>) -> Result<Query, BuildError> {
    Query::intersect(queries)
}

pub fn union(queries: impl IntoIterator<Item = Query>) -> Result<Query, BuildError> {
    Query::union(queries)
}

pub fn difference(queries: impl IntoIterator<Item = Query>) -> Result<Query, BuildError> {
    Query::difference(queries)
}

pub fn count(query: Query) -> Query {
    Query::count(query)
}

pub fn top_n(collection: &Collection, n: u64) -> Query {
    collection.top_n(n)
}

pub fn filtered_top_n(collection: &Collection, n: u64, filter: Query) -> Result<Query, BuildError> {
    collection.filtered_top_n(n, filter)
}

pub fn set_bit(collection: &Collection, row_id: u64, column_id: u64) -> Query {
    collection.set_bit(row_id, column_id)
}

pub fn clear_bit(collection: &Collection, row_id: u64, column_id: u64) -> Query {
    collection.clear_bit(row_id, column_id)
}

/// Run `query` with default options.
pub fn execute<T: Transport + ?Sized>(
    client: &T,
    query: &Query,
) -> Result<QueryResponse, QueryError> {
    execute_with(client, query, &QueryOptions::default())
}

/// Run `query` against the index its collections belong to.
pub fn execute_with<T: Transport + ?Sized>(
    client: &T,
    query: &Query,
    options: &QueryOptions,
) -> Result<QueryResponse, QueryError> {
    let pql = query.to_pql();
    let index = query.index().map_err(|source| QueryError::Malformed {
        pql: pql.clone(),
        source,
    })?;
    tracing::debug!(index, pql = %pql, ?options, "executing query");

    client
        .query(index, query, options)
        .map_err(|source| QueryError::Transport {
            index: index.to_string(),
            pql,
            source,
        })
}

pub fn decode_bitmap(response: &QueryResponse) -> Result<BitSet, DecodeError> {
    response.as_bitmap().map(|b| b.bits.clone())
}

pub fn decode_top_n(response: &QueryResponse) -> Result<Vec<CountItem>, DecodeError> {
    response.as_count_items().map(<[CountItem]>::to_vec)
}

pub fn decode_count(response: &QueryResponse) -> Result<u64, DecodeError> {
    response.as_count()
}

pub fn decode_changed(response: &QueryResponse) -> Result<bool, DecodeError> {
    response.as_changed()
}

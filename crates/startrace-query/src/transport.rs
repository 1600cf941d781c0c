//! The collaborator that actually runs queries.

use crate::error::TransportError;
use crate::query::Query;
use crate::response::QueryResponse;
use crate::schema::Schema;

/// Per-call result-shape hints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Also return attribute sets of the columns in bitmap results.
    pub column_attrs: bool,
    /// Omit row attributes from bitmap results.
    pub exclude_attrs: bool,
    /// Omit the bits of bitmap results (useful with `column_attrs`).
    pub exclude_bits: bool,
}

/// Executes queries against a bitmap index server.
///
/// Calls block until the server answers or fails. Timeouts, retries and
/// connection reuse are the implementation's business.
pub trait Transport {
    fn query(
        &self,
        index: &str,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<QueryResponse, TransportError>;

    fn schema(&self) -> Result<Schema, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn query(
        &self,
        index: &str,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<QueryResponse, TransportError> {
        (**self).query(index, query, options)
    }

    fn schema(&self) -> Result<Schema, TransportError> {
        (**self).schema()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn query(
        &self,
        index: &str,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<QueryResponse, TransportError> {
        (**self).query(index, query, options)
    }

    fn schema(&self) -> Result<Schema, TransportError> {
        (**self).schema()
    }
}

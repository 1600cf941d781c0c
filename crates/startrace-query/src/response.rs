//! Typed query results and the response envelope.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::bitset::BitSet;
use crate::error::{DecodeError, TransportError};

/// Attribute values attached to rows or columns.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Shape of a [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Bitmap,
    CountItems,
    Count,
    Changed,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultKind::Bitmap => "bitmap",
            ResultKind::CountItems => "top-n",
            ResultKind::Count => "count",
            ResultKind::Changed => "mutation",
        })
    }
}

/// One ranked row from a top-N aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct CountItem {
    pub id: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BitmapResult {
    pub bits: BitSet,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Bitmap(BitmapResult),
    CountItems(Vec<CountItem>),
    Count(u64),
    /// Whether a set/clear bit changed the stored state.
    Changed(bool),
}

impl QueryResult {
    pub fn kind(&self) -> ResultKind {
        match self {
            QueryResult::Bitmap(_) => ResultKind::Bitmap,
            QueryResult::CountItems(_) => ResultKind::CountItems,
            QueryResult::Count(_) => ResultKind::Count,
            QueryResult::Changed(_) => ResultKind::Changed,
        }
    }
}

/// Attributes of a single column, returned when `column_attrs` is requested.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnAttributes {
    pub id: u64,
    #[serde(default)]
    pub attrs: Attributes,
}

/// Result of executing one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    result: QueryResult,
    column_attributes: Vec<ColumnAttributes>,
}

impl QueryResponse {
    pub fn new(result: QueryResult) -> Self {
        Self {
            result,
            column_attributes: Vec::new(),
        }
    }

    pub fn with_column_attributes(mut self, columns: Vec<ColumnAttributes>) -> Self {
        self.column_attributes = columns;
        self
    }

    pub fn result(&self) -> &QueryResult {
        &self.result
    }

    pub fn into_result(self) -> QueryResult {
        self.result
    }

    pub fn column_attributes(&self) -> &[ColumnAttributes] {
        &self.column_attributes
    }

    fn mismatch(&self, expected: ResultKind) -> DecodeError {
        DecodeError {
            expected,
            found: self.result.kind(),
        }
    }

    pub fn as_bitmap(&self) -> Result<&BitmapResult, DecodeError> {
        match &self.result {
            QueryResult::Bitmap(bitmap) => Ok(bitmap),
            _ => Err(self.mismatch(ResultKind::Bitmap)),
        }
    }

    pub fn as_count_items(&self) -> Result<&[CountItem], DecodeError> {
        match &self.result {
            QueryResult::CountItems(items) => Ok(items),
            _ => Err(self.mismatch(ResultKind::CountItems)),
        }
    }

    pub fn as_count(&self) -> Result<u64, DecodeError> {
        match &self.result {
            QueryResult::Count(n) => Ok(*n),
            _ => Err(self.mismatch(ResultKind::Count)),
        }
    }

    pub fn as_changed(&self) -> Result<bool, DecodeError> {
        match &self.result {
            QueryResult::Changed(changed) => Ok(*changed),
            _ => Err(self.mismatch(ResultKind::Changed)),
        }
    }
}

// ============================================================================
// Wire decoding
// ============================================================================

/// Body of a successful `POST /index/{index}/query`.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponseWire {
    #[serde(default)]
    pub results: Vec<ResultWire>,
    #[serde(default, rename = "columnAttrs")]
    pub column_attrs: Option<Vec<ColumnAttributes>>,
}

/// The server does not tag its results; each shape is distinct in JSON.
///
/// `CountItems` must be tried first: a struct with defaulted fields also
/// accepts an empty JSON array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ResultWire {
    CountItems(Vec<CountItem>),
    Bitmap {
        #[serde(default)]
        bits: Vec<u64>,
        #[serde(default)]
        attrs: Attributes,
    },
    Count(u64),
    Changed(bool),
}

impl From<ResultWire> for QueryResult {
    fn from(wire: ResultWire) -> Self {
        match wire {
            ResultWire::Bitmap { bits, attrs } => QueryResult::Bitmap(BitmapResult {
                bits: bits.into_iter().collect(),
                attributes: attrs,
            }),
            ResultWire::CountItems(items) => QueryResult::CountItems(items),
            ResultWire::Count(n) => QueryResult::Count(n),
            ResultWire::Changed(changed) => QueryResult::Changed(changed),
        }
    }
}

impl QueryResponseWire {
    /// Convert a single-query body into a typed response.
    ///
    /// An empty JSON array is read as an empty top-N list by the untagged
    /// decoder, so `expected` is used to recover empty bitmaps.
    pub fn into_response(self, expected: ResultKind) -> Result<QueryResponse, TransportError> {
        let mut results = self.results;
        if results.len() != 1 {
            return Err(TransportError::InvalidResponse(format!(
                "expected exactly one result, got {}",
                results.len()
            )));
        }
        let mut result = QueryResult::from(results.remove(0));
        if let QueryResult::CountItems(items) = &result {
            if items.is_empty() && expected == ResultKind::Bitmap {
                result = QueryResult::Bitmap(BitmapResult::default());
            }
        }
        Ok(QueryResponse::new(result)
            .with_column_attributes(self.column_attrs.unwrap_or_default()))
    }
}

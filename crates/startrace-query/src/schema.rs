//! Index and collection handles, and the schema a transport reports.
//!
//! Handles are cheap to clone (names are shared `Arc<str>`) and carry no
//! connection state; they exist only to build queries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;

use crate::error::BuildError;
use crate::query::Query;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]{0,63}$").expect("static name pattern"))
}

fn validate_name(kind: &'static str, name: &str) -> Result<Arc<str>, BuildError> {
    if name_pattern().is_match(name) {
        Ok(Arc::from(name))
    } else {
        Err(BuildError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

// ============================================================================
// Handles
// ============================================================================

/// A named namespace grouping collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    name: Arc<str>,
}

impl Index {
    pub fn new(name: &str) -> Result<Self, BuildError> {
        Ok(Self {
            name: validate_name("index", name)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for a collection inside this index.
    pub fn collection(&self, name: &str) -> Result<Collection, BuildError> {
        Ok(Collection {
            index: self.name.clone(),
            name: validate_name("collection", name)?,
        })
    }

    /// Intersection of `queries`, all of which must target this index.
    pub fn intersect(&self, queries: impl IntoIterator<Item = Query>) -> Result<Query, BuildError> {
        let children = self.own_children(queries)?;
        Query::intersect(children)
    }

    /// Union of `queries`, all of which must target this index.
    pub fn union(&self, queries: impl IntoIterator<Item = Query>) -> Result<Query, BuildError> {
        let children = self.own_children(queries)?;
        Query::union(children)
    }

    /// First query minus all the others, all of which must target this index.
    pub fn difference(
        &self,
        queries: impl IntoIterator<Item = Query>,
    ) -> Result<Query, BuildError> {
        let children = self.own_children(queries)?;
        Query::difference(children)
    }

    /// Cardinality of `query`'s result.
    pub fn count(&self, query: Query) -> Result<Query, BuildError> {
        let mut children = self.own_children([query])?;
        Ok(Query::count(children.remove(0)))
    }

    fn own_children(
        &self,
        queries: impl IntoIterator<Item = Query>,
    ) -> Result<Vec<Query>, BuildError> {
        let children: Vec<Query> = queries.into_iter().collect();
        for child in &children {
            match child.index() {
                Ok(found) if found == self.name() => {}
                Ok(found) => {
                    return Err(BuildError::IndexMismatch {
                        expected: self.name().to_string(),
                        found: found.to_string(),
                    })
                }
                Err(e) => return Err(e),
            }
        }
        Ok(children)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A named row-indexed bitmap structure within an index (a "frame" on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    index: Arc<str>,
    name: Arc<str>,
}

impl Collection {
    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All column IDs set under `row_id`.
    pub fn bitmap(&self, row_id: u64) -> Query {
        Query::Bitmap {
            collection: self.clone(),
            row_id,
        }
    }

    /// The `n` rows with the most columns set.
    pub fn top_n(&self, n: u64) -> Query {
        Query::TopN {
            collection: self.clone(),
            n,
            filter: None,
        }
    }

    /// The `n` rows with the most columns set, counting only columns in `filter`.
    pub fn filtered_top_n(&self, n: u64, filter: Query) -> Result<Query, BuildError> {
        let found = filter.index()?;
        if found != self.index_name() {
            return Err(BuildError::IndexMismatch {
                expected: self.index_name().to_string(),
                found: found.to_string(),
            });
        }
        Ok(Query::TopN {
            collection: self.clone(),
            n,
            filter: Some(Box::new(filter)),
        })
    }

    pub fn set_bit(&self, row_id: u64, column_id: u64) -> Query {
        Query::SetBit {
            collection: self.clone(),
            row_id,
            column_id,
        }
    }

    pub fn clear_bit(&self, row_id: u64, column_id: u64) -> Query {
        Query::ClearBit {
            collection: self.clone(),
            row_id,
            column_id,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.index, self.name)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Index and collection names known to a server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    indexes: BTreeMap<String, Vec<String>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a collection (and its index) as present.
    pub fn add(&mut self, index: &str, collection: &str) {
        let collections = self.indexes.entry(index.to_string()).or_default();
        if !collections.iter().any(|c| c == collection) {
            collections.push(collection.to_string());
        }
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.indexes.contains_key(index)
    }

    pub fn has_collection(&self, index: &str, collection: &str) -> bool {
        self.indexes
            .get(index)
            .is_some_and(|cs| cs.iter().any(|c| c == collection))
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(|s| s.as_str())
    }

    pub fn collection_names(&self, index: &str) -> impl Iterator<Item = &str> {
        self.indexes
            .get(index)
            .into_iter()
            .flat_map(|cs| cs.iter().map(|s| s.as_str()))
    }

    /// Handle for `name`. Indexes the server does not know yet are still
    /// returned; queries against them are rejected by the server.
    pub fn index(&self, name: &str) -> Result<Index, BuildError> {
        Index::new(name)
    }
}

/// Wire form of `GET /schema`.
#[derive(Debug, Deserialize)]
pub(crate) struct SchemaInfo {
    #[serde(default)]
    pub indexes: Option<Vec<IndexInfo>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IndexInfo {
    pub name: String,
    #[serde(default)]
    pub frames: Option<Vec<FrameInfo>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FrameInfo {
    pub name: String,
}

impl From<SchemaInfo> for Schema {
    fn from(info: SchemaInfo) -> Self {
        let mut schema = Schema::new();
        for index in info.indexes.unwrap_or_default() {
            schema.indexes.entry(index.name.clone()).or_default();
            for frame in index.frames.unwrap_or_default() {
                schema.add(&index.name, &frame.name);
            }
        }
        schema
    }
}

//! Query expression trees and their PQL serialization.

use std::fmt;

use crate::error::BuildError;
use crate::response::ResultKind;
use crate::schema::Collection;

/// An immutable bitmap query.
///
/// Leaves address a single collection; interior nodes combine the bitmaps
/// produced by their children. `Display` renders the tree as PQL, e.g.
/// `Intersect(Bitmap(rowID=14, frame='stargazer'), Bitmap(rowID=19, frame='stargazer'))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Column IDs set under one row.
    Bitmap { collection: Collection, row_id: u64 },
    Intersect(Vec<Query>),
    Union(Vec<Query>),
    /// First child minus every following child.
    Difference(Vec<Query>),
    /// Cardinality of the child bitmap.
    Count(Box<Query>),
    /// Highest-count rows, optionally counting only columns in `filter`.
    TopN {
        collection: Collection,
        n: u64,
        filter: Option<Box<Query>>,
    },
    SetBit {
        collection: Collection,
        row_id: u64,
        column_id: u64,
    },
    ClearBit {
        collection: Collection,
        row_id: u64,
        column_id: u64,
    },
}

impl Query {
    /// Set intersection of all children. One child behaves as identity.
    ///
    /// Every child must run against the same index.
    pub fn intersect(children: impl IntoIterator<Item = Query>) -> Result<Self, BuildError> {
        Ok(Self::Intersect(same_index("Intersect", children)?))
    }

    /// Set union of all children. One child behaves as identity.
    pub fn union(children: impl IntoIterator<Item = Query>) -> Result<Self, BuildError> {
        Ok(Self::Union(same_index("Union", children)?))
    }

    pub fn difference(children: impl IntoIterator<Item = Query>) -> Result<Self, BuildError> {
        Ok(Self::Difference(same_index("Difference", children)?))
    }

    pub fn count(child: Query) -> Self {
        Self::Count(Box::new(child))
    }

    /// Name of the index this query runs against.
    ///
    /// Walks the whole tree: an empty interior node or a node whose
    /// descendants span more than one index is an error.
    pub fn index(&self) -> Result<&str, BuildError> {
        match self {
            Query::Bitmap { collection, .. }
            | Query::SetBit { collection, .. }
            | Query::ClearBit { collection, .. } => Ok(collection.index_name()),
            Query::TopN {
                collection, filter, ..
            } => {
                let index = collection.index_name();
                if let Some(filter) = filter {
                    expect_index(index, filter.index()?)?;
                }
                Ok(index)
            }
            Query::Count(child) => child.index(),
            Query::Intersect(children) => common_index("Intersect", children),
            Query::Union(children) => common_index("Union", children),
            Query::Difference(children) => common_index("Difference", children),
        }
    }

    /// Shape of the result a server returns for this query.
    pub fn result_kind(&self) -> ResultKind {
        match self {
            Query::Bitmap { .. }
            | Query::Intersect(_)
            | Query::Union(_)
            | Query::Difference(_) => ResultKind::Bitmap,
            Query::Count(_) => ResultKind::Count,
            Query::TopN { .. } => ResultKind::CountItems,
            Query::SetBit { .. } | Query::ClearBit { .. } => ResultKind::Changed,
        }
    }

    pub fn is_mutation(&self) -> bool {
        matches!(self, Query::SetBit { .. } | Query::ClearBit { .. })
    }

    pub fn to_pql(&self) -> String {
        self.to_string()
    }
}

fn same_index(
    op: &'static str,
    children: impl IntoIterator<Item = Query>,
) -> Result<Vec<Query>, BuildError> {
    let children: Vec<Query> = children.into_iter().collect();
    common_index(op, &children)?;
    Ok(children)
}

fn common_index<'a>(op: &'static str, children: &'a [Query]) -> Result<&'a str, BuildError> {
    let (first, rest) = children
        .split_first()
        .ok_or(BuildError::EmptyOperands { op })?;
    let index = first.index()?;
    for child in rest {
        expect_index(index, child.index()?)?;
    }
    Ok(index)
}

fn expect_index(expected: &str, found: &str) -> Result<(), BuildError> {
    if expected == found {
        Ok(())
    } else {
        Err(BuildError::IndexMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

fn write_call(f: &mut fmt::Formatter<'_>, name: &str, children: &[Query]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Bitmap { collection, row_id } => {
                write!(f, "Bitmap(rowID={row_id}, frame='{}')", collection.name())
            }
            Query::Intersect(children) => write_call(f, "Intersect", children),
            Query::Union(children) => write_call(f, "Union", children),
            Query::Difference(children) => write_call(f, "Difference", children),
            Query::Count(child) => write!(f, "Count({child})"),
            Query::TopN {
                collection,
                n,
                filter,
            } => match filter {
                Some(filter) => write!(f, "TopN({filter}, frame='{}', n={n})", collection.name()),
                None => write!(f, "TopN(frame='{}', n={n})", collection.name()),
            },
            Query::SetBit {
                collection,
                row_id,
                column_id,
            } => write!(
                f,
                "SetBit(rowID={row_id}, frame='{}', columnID={column_id})",
                collection.name()
            ),
            Query::ClearBit {
                collection,
                row_id,
                column_id,
            } => write!(
                f,
                "ClearBit(rowID={row_id}, frame='{}', columnID={column_id})",
                collection.name()
            ),
        }
    }
}

//! Startrace query: typed queries for a bitmap index server.
//!
//! A bitmap index stores, per collection, one bitmap of column IDs for every
//! row ID. This crate provides:
//! 1. **Handles**: validated [`Index`] and [`Collection`] names resolved from a [`Schema`]
//! 2. **Queries**: an immutable [`Query`] tree (bitmap fetch, intersect, union,
//!    difference, count, top-N, set/clear bit) that renders as PQL
//! 3. **Execution**: the [`Transport`] seam, with an HTTP implementation
//!    ([`HttpTransport`]) and an in-memory one ([`MemoryTransport`])
//! 4. **Decoding**: a tagged [`QueryResult`], so asking a top-N response for
//!    a bitmap is a [`DecodeError`] rather than an empty field
//!
//! ```no_run
//! use startrace_query::{facade, ClientConfig, HttpTransport, Transport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpTransport::new(&ClientConfig::default())?;
//! let repository = client.schema()?.index("repository")?;
//! let stargazer = repository.collection("stargazer")?;
//!
//! let both = repository.intersect([stargazer.bitmap(14), stargazer.bitmap(19)])?;
//! let ids = facade::decode_bitmap(&facade::execute(&client, &both)?)?;
//! println!("{:?}", ids.to_vec());
//! # Ok(())
//! # }
//! ```

pub mod bitset;
pub mod config;
pub mod error;
pub mod facade;
pub mod http;
pub mod memory;
pub mod query;
pub mod response;
pub mod schema;
pub mod transport;

pub use bitset::BitSet;
pub use config::{ClientConfig, Uri};
pub use error::{BuildError, ConfigError, DecodeError, QueryError, TransportError};
pub use http::HttpTransport;
pub use memory::MemoryTransport;
pub use query::Query;
pub use response::{
    Attributes, BitmapResult, ColumnAttributes, CountItem, QueryResponse, QueryResult,
    ResultKind,
};
pub use schema::{Collection, Index, Schema};
pub use transport::{QueryOptions, Transport};

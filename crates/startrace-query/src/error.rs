//! Error types for query construction, transport, and decoding.

use crate::response::ResultKind;

/// A query tree could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("{op} requires at least one child query")]
    EmptyOperands { op: &'static str },

    #[error("query over index `{found}` cannot be combined under index `{expected}`")]
    IndexMismatch { expected: String, found: String },

    #[error("invalid {kind} name `{name}` (expected ^[a-z][a-z0-9_-]{{0,63}}$)")]
    InvalidName { kind: &'static str, name: String },
}

/// Failure reported by a transport collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A query failed to execute. Carries the PQL text and the index it targeted.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("query `{pql}` on index `{index}` failed")]
    Transport {
        index: String,
        pql: String,
        #[source]
        source: TransportError,
    },

    #[error("query `{pql}` cannot be sent")]
    Malformed {
        pql: String,
        #[source]
        source: BuildError,
    },
}

impl QueryError {
    pub fn pql(&self) -> &str {
        match self {
            QueryError::Transport { pql, .. } | QueryError::Malformed { pql, .. } => pql,
        }
    }

    /// HTTP-style status of the underlying server rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Transport {
                source: TransportError::Server { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

/// A response did not have the shape the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected a {expected} result, found {found}")]
pub struct DecodeError {
    pub expected: ResultKind,
    pub found: ResultKind,
}

/// Client configuration could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid server address `{0}`")]
    InvalidAddress(String),

    #[error("unsupported scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

//! # Waypoint - Schema-driven record store
//!
//! A small persistence layer for trip-planning data. Record types are
//! declared once as ordered lists of named fields and the store derives the
//! statements needed to create, insert, search and delete them.
//!
//! Waypoint provides:
//! - Declarative schemas with an optional unique key field
//! - Positional wildcard search and delete with bound parameters only
//! - A single serialized SQLite connection behind an explicit store handle
//! - Salted SHA-256 credential creation and verification

pub mod schema;
pub mod predicate;
pub mod storage;
pub mod auth;
pub mod config;
pub mod ui;


// Re-exports for convenient access
pub use schema::{FieldType, Schema, SchemaError, SchemaRegistry};
pub use predicate::{Filter, Predicate};
pub use storage::{Record, RecordStore, StoreState, StoreStats};
pub use auth::{SaltedHash, create_salted_hash, hash_with_salt, register_user, verify_credentials};

/// Result type alias for Waypoint operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Waypoint operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Store is disconnected: {0}")]
    Disconnected(String),

    #[error("Arity mismatch for {schema}: expected {expected} values, got {actual}")]
    ArityMismatch {
        schema: String,
        expected: usize,
        actual: usize,
    },

    #[error("Predicate for {schema} has no concrete values")]
    EmptyPredicate { schema: String },

    #[error("Duplicate key in {schema}.{field}")]
    DuplicateKey { schema: String, field: String },

    #[error("Missing value for {schema}.{field}")]
    MissingField { schema: String, field: String },

    #[error("Invalid salt: {0}")]
    InvalidSalt(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl Error {
    /// True for calls refused before any storage access
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::ArityMismatch { .. } | Error::EmptyPredicate { .. } | Error::UnknownSchema(_)
        )
    }
}

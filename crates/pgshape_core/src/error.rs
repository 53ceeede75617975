use thiserror::Error;

use crate::QueryId;

/// Originating SQL text and parameter values, attached to errors whose kind
/// is only meaningful alongside the query that produced them.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub sql: String,
    pub values: Vec<crate::Value>,
}

/// The closed error taxonomy. Raw backend errors are mapped into one of
/// these by the driver's backend-code mapper; the query-method layer adds
/// `NotFound` and `DataIntegrity` on top of an otherwise successful raw
/// result. Nothing outside this enum is ever raised to a caller.
#[derive(Debug, Error)]
pub enum PgShapeError {
    /// Backend rejected a parameter value (SQLSTATE 22P02).
    #[error("invalid input: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: BoxedSource,
    },

    /// The backend session died unexpectedly (SQLSTATE 57P01).
    #[error("backend terminated")]
    BackendTerminated {
        #[source]
        source: BoxedSource,
    },

    /// The statement was actively cancelled by user request (SQLSTATE 57014,
    /// disambiguated from `StatementTimeout` by message content).
    #[error("statement cancelled")]
    StatementCancelled {
        #[source]
        source: BoxedSource,
    },

    /// The statement exceeded its allotted time (SQLSTATE 57014).
    #[error("statement timeout")]
    StatementTimeout {
        #[source]
        source: BoxedSource,
    },

    #[error("null value violates not-null constraint")]
    NotNullIntegrityConstraintViolation {
        #[source]
        source: BoxedSource,
    },

    #[error("foreign key constraint violation")]
    ForeignKeyIntegrityConstraintViolation {
        #[source]
        source: BoxedSource,
    },

    #[error("unique constraint violation")]
    UniqueIntegrityConstraintViolation {
        #[source]
        source: BoxedSource,
    },

    #[error("check constraint violation")]
    CheckIntegrityConstraintViolation {
        #[source]
        source: BoxedSource,
    },

    /// Backend rejected the SQL text itself (SQLSTATE 42601).
    #[error("syntax error in query: {}", context.sql)]
    // thiserror interpolates the trailing expression list positionally,
    // same as format!("...", context.sql).
    InputSyntax {
        context: QueryContext,
        #[source]
        source: BoxedSource,
    },

    /// Shape layer only: zero rows where the contract required at least one.
    #[error("no rows returned by query ({query_id})")]
    NotFound { query_id: QueryId },

    /// Shape layer only: row or column cardinality violates the method
    /// contract (e.g. more than one row for `one`, more than one column for
    /// a `*First` method).
    #[error("{reason} ({query_id})")]
    DataIntegrity { reason: String, query_id: QueryId },

    /// Any raw backend error that does not match a known SQLSTATE code (or
    /// carries no code at all) passes through unchanged.
    #[error("{0}")]
    Driver(#[source] BoxedSource),
}

/// Type-erased cause. Mapped-error variants box the raw `tokio_postgres`
/// error behind this so `pgshape_core` stays independent of the concrete
/// wire-protocol crate the driver adapter happens to use.
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

impl PgShapeError {
    pub fn not_found(query_id: QueryId) -> Self {
        Self::NotFound { query_id }
    }

    pub fn data_integrity(query_id: QueryId, reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            query_id,
            reason: reason.into(),
        }
    }

    /// A short human-readable label for the log record that must precede
    /// every shape error. Driver-mapped errors are not logged by the core
    /// (the caller decides), so they have no label here.
    pub fn shape_log_label(&self) -> Option<&'static str> {
        match self {
            Self::NotFound { .. } => Some("NotFoundError"),
            Self::DataIntegrity { .. } => Some("DataIntegrityError"),
            _ => None,
        }
    }
}

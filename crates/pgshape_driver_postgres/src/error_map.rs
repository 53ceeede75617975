//! Translates raw `tokio_postgres::Error`s into the closed taxonomy.
//! Grounded on the teacher's own `format_pg_error`, but keyed off SQLSTATE
//! codes rather than message substrings — the backend guarantees the code,
//! while message text is locale-dependent.

use pgshape_core::{PgShapeError, QueryContext};

const CANCELLATION_SUBSTRING: &str = "canceling statement due to user request";

/// Maps a raw driver error into a [`PgShapeError`], given the query context
/// it originated from. Errors without a SQLSTATE code (connection setup
/// failures, protocol-level errors) pass through as [`PgShapeError::Driver`]
/// unchanged.
pub fn map_backend_error(error: tokio_postgres::Error, context: QueryContext) -> PgShapeError {
    let Some(code) = error.code() else {
        return PgShapeError::Driver(Box::new(error));
    };

    match code.code() {
        "22P02" => {
            let message = error.to_string();
            PgShapeError::InvalidInput {
                message,
                source: Box::new(error),
            }
        }
        "57P01" => PgShapeError::BackendTerminated {
            source: Box::new(error),
        },
        "57014" => {
            if error.to_string().contains(CANCELLATION_SUBSTRING) {
                PgShapeError::StatementCancelled {
                    source: Box::new(error),
                }
            } else {
                PgShapeError::StatementTimeout {
                    source: Box::new(error),
                }
            }
        }
        "23502" => PgShapeError::NotNullIntegrityConstraintViolation {
            source: Box::new(error),
        },
        "23503" => PgShapeError::ForeignKeyIntegrityConstraintViolation {
            source: Box::new(error),
        },
        "23505" => PgShapeError::UniqueIntegrityConstraintViolation {
            source: Box::new(error),
        },
        "23514" => PgShapeError::CheckIntegrityConstraintViolation {
            source: Box::new(error),
        },
        "42601" => PgShapeError::InputSyntax {
            context,
            source: Box::new(error),
        },
        _ => PgShapeError::Driver(Box::new(error)),
    }
}

#[cfg(test)]
mod tests {
    // `tokio_postgres::Error` has no public constructor outside the wire
    // layer, so the code-to-kind table above is exercised end to end by
    // `tests/live_integration.rs` against a real backend instead of here.
}

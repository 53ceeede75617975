use serde::Serialize;
use uuid::Uuid;

/// Opaque identifier correlating every log record and mapped error raised
/// while servicing one logical query.
///
/// The only propagation policy is [`QueryId::inherit_or_new`]: callers that
/// already have an id (because they are nested inside a caller's own query)
/// pass it through unchanged; everyone else gets a fresh one. No other way to
/// construct a non-fresh `QueryId` is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueryId(Uuid);

impl QueryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns `inherited` if present, otherwise generates a fresh id.
    pub fn inherit_or_new(inherited: Option<QueryId>) -> Self {
        inherited.unwrap_or_else(Self::new)
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

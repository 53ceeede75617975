use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{PgShapeError, QueryResult, StreamItem, Value};

/// A notice the backend emitted asynchronously during the session. Forwarded
/// verbatim; only notices with a non-empty message are ever produced.
#[derive(Debug, Clone)]
pub struct NoticeEvent {
    pub message: String,
}

/// The abstract connection contract the query-method layer is generic over.
/// A concrete implementation (e.g. `pgshape_driver_postgres::PostgresConnection`)
/// wraps one underlying wire-protocol client.
///
/// `query` and `stream` take `&mut self` rather than `&self`: the borrow
/// checker then enforces FIFO ordering within one connection, since a second
/// call can't be written against the same live mutable borrow.
#[async_trait]
pub trait Connection: Send {
    /// Opens the underlying client. Must succeed before `query`/`stream`.
    async fn connect(&mut self) -> Result<(), PgShapeError>;

    /// Closes the underlying client and detaches the notice listener.
    /// Idempotence is not required.
    async fn end(&mut self) -> Result<(), PgShapeError>;

    /// Runs a single statement to completion and returns the normalized
    /// result. Raw errors are passed through the backend-code mapper before
    /// being re-raised.
    async fn query(&mut self, sql: &str, values: &[Value]) -> Result<QueryResult, PgShapeError>;

    /// Opens a streaming cursor. The returned stream's items carry whatever
    /// fields are known when each row arrives; fields become available only
    /// after the first row-description event, which does not fire until
    /// consumption begins and never fires at all on a syntax error.
    fn stream<'a>(
        &'a mut self,
        sql: &'a str,
        values: &'a [Value],
    ) -> BoxStream<'a, Result<StreamItem, PgShapeError>>;

    /// Takes ownership of the channel notices are forwarded on. Returns
    /// `None` if already taken or if `connect` has not been called yet.
    fn take_notice_receiver(&mut self) -> Option<UnboundedReceiver<NoticeEvent>>;
}

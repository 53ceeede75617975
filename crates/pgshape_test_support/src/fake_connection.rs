use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use indexmap::IndexMap;
use pgshape_core::{Connection, NoticeEvent, PgShapeError, QueryResult, Row, StreamItem, Value};
use tokio::sync::mpsc::UnboundedReceiver;

/// Builds a [`Row`] from an ordered list of name/value pairs, preserving the
/// order given — the same thing `shape`'s "first column" projection reads.
pub fn row<const N: usize>(entries: [(&str, Value); N]) -> Row {
    let mut map: IndexMap<String, Value> = IndexMap::with_capacity(N);
    for (name, value) in entries {
        map.insert(name.to_string(), value);
    }
    map
}

/// An in-memory [`Connection`] double for exercising the query-method layer
/// without a real backend. Returns a fixed set of rows (or a fixed error) to
/// every `query`/`stream` call, regardless of the SQL text given.
pub struct FakeConnection {
    rows: Vec<Row>,
    error: Option<PgShapeError>,
    connected: bool,
}

impl FakeConnection {
    /// A connection that answers every query with `rows`.
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            error: None,
            connected: true,
        }
    }

    /// A connection that fails every query with `error`.
    pub fn with_error(error: PgShapeError) -> Self {
        Self {
            rows: Vec::new(),
            error: Some(error),
            connected: true,
        }
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn connect(&mut self) -> Result<(), PgShapeError> {
        self.connected = true;
        Ok(())
    }

    async fn end(&mut self) -> Result<(), PgShapeError> {
        self.connected = false;
        Ok(())
    }

    async fn query(&mut self, _sql: &str, _values: &[Value]) -> Result<QueryResult, PgShapeError> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        let fields = self
            .rows
            .first()
            .map(|row| {
                row.keys()
                    .map(|name| pgshape_core::Field {
                        name: name.clone(),
                        data_type_id: 0,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(QueryResult {
            command: pgshape_core::Command::Select,
            row_count: Some(self.rows.len() as u64),
            fields,
            rows: self.rows.clone(),
        })
    }

    fn stream<'a>(
        &'a mut self,
        _sql: &'a str,
        _values: &'a [Value],
    ) -> BoxStream<'a, Result<StreamItem, PgShapeError>> {
        if let Some(error) = self.error.take() {
            return stream::once(async move { Err(error) }).boxed();
        }

        let fields: Vec<pgshape_core::Field> = self
            .rows
            .first()
            .map(|row| {
                row.keys()
                    .map(|name| pgshape_core::Field {
                        name: name.clone(),
                        data_type_id: 0,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let items = self
            .rows
            .clone()
            .into_iter()
            .map(move |row| Ok(StreamItem { fields: fields.clone(), row }))
            .collect::<Vec<_>>();

        stream::iter(items).boxed()
    }

    fn take_notice_receiver(&mut self) -> Option<UnboundedReceiver<NoticeEvent>> {
        None
    }
}

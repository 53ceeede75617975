//! The `tokio-postgres`-backed realization of `pgshape_core::Connection`.
//! `PostgresDriver` is the per-configuration factory owning the memoized
//! type-parser resolution; `PostgresConnection` is what each `connect()`
//! call yields.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt, pin_mut};
use pgshape_core::{
    ClientConfiguration, Connection, Field, NoticeEvent, PgShapeError, QueryContext, QueryResult,
    StreamItem, Value,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, OnceCell};
use tokio_postgres::AsyncMessage;

use crate::config_map::{MappedConfig, map_client_configuration};
use crate::error_map::map_backend_error;
use crate::sql_param::ValueParam;
use crate::type_registry::{TypeRegistry, build_type_registry};
use crate::value_codec::{command_from_sql, decode_row, fields_from_columns, fields_from_row};

/// Owns one `ClientConfiguration` and the type-registry resolution shared by
/// every connection built from it. Construct once per logical database, not
/// once per connection.
pub struct PostgresDriver {
    configuration: ClientConfiguration,
    type_registry: Arc<OnceCell<Arc<TypeRegistry>>>,
}

impl PostgresDriver {
    pub fn new(configuration: ClientConfiguration) -> Self {
        Self {
            configuration,
            type_registry: Arc::new(OnceCell::new()),
        }
    }

    /// Builds a not-yet-connected [`PostgresConnection`]. Call `connect()` on
    /// the result before issuing any query.
    pub fn connection(&self) -> PostgresConnection {
        PostgresConnection {
            mapped: map_client_configuration(&self.configuration),
            type_parsers: self.configuration.type_parsers.clone(),
            type_registry: self.type_registry.clone(),
            client: None,
            notice_rx: None,
            io_task: None,
        }
    }
}

pub struct PostgresConnection {
    mapped: MappedConfig,
    type_parsers: Vec<pgshape_core::TypeParser>,
    type_registry: Arc<OnceCell<Arc<TypeRegistry>>>,
    client: Option<tokio_postgres::Client>,
    notice_rx: Option<UnboundedReceiver<NoticeEvent>>,
    io_task: Option<tokio::task::JoinHandle<()>>,
}

impl PostgresConnection {
    fn client(&self) -> Result<&tokio_postgres::Client, PgShapeError> {
        self.client.as_ref().ok_or_else(|| {
            PgShapeError::Driver(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "connect() was not called before this operation",
            )))
        })
    }

    async fn registry(&self) -> Result<Arc<TypeRegistry>, PgShapeError> {
        let client = self.client()?;
        let parsers = &self.type_parsers;
        self.type_registry
            .get_or_try_init(|| async { build_type_registry(client, parsers).await.map(Arc::new) })
            .await
            .cloned()
    }

    fn bind_params<'a>(values: &'a [Value]) -> Vec<ValueParam<'a>> {
        values.iter().map(ValueParam).collect()
    }
}

#[async_trait]
impl Connection for PostgresConnection {
    async fn connect(&mut self) -> Result<(), PgShapeError> {
        let tls_connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(self.mapped.tls_accept_invalid_certs)
            .build()
            .map_err(|e| PgShapeError::Driver(Box::new(e)))?;
        let tls = postgres_native_tls::MakeTlsConnector::new(tls_connector);

        let (client, rx, io_task) = if self.mapped.tls_required {
            let (client, connection) = self
                .mapped
                .config
                .connect(tls)
                .await
                .map_err(|e| PgShapeError::Driver(Box::new(e)))?;
            let (rx, io_task) = spawn_connection_driver(connection);
            (client, rx, io_task)
        } else {
            let (client, connection) = self
                .mapped
                .config
                .connect(tokio_postgres::NoTls)
                .await
                .map_err(|e| PgShapeError::Driver(Box::new(e)))?;
            let (rx, io_task) = spawn_connection_driver(connection);
            (client, rx, io_task)
        };

        for statement in &self.mapped.post_connect_statements {
            client
                .batch_execute(statement)
                .await
                .map_err(|e| PgShapeError::Driver(Box::new(e)))?;
        }

        self.client = Some(client);
        self.notice_rx = Some(rx);
        self.io_task = Some(io_task);
        Ok(())
    }

    async fn end(&mut self) -> Result<(), PgShapeError> {
        self.client = None;
        self.notice_rx = None;
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
        Ok(())
    }

    async fn query(&mut self, sql: &str, values: &[Value]) -> Result<QueryResult, PgShapeError> {
        log::debug!("executing query: {sql}");
        let registry = self.registry().await?;
        let client = self.client()?;

        let context = || QueryContext {
            sql: sql.to_string(),
            values: values.to_vec(),
        };

        // Prepared first so the declared column list is known even when the
        // statement returns zero rows (a bare `SELECT ... WHERE false` still
        // reports its columns, not an empty field list).
        let statement = client
            .prepare(sql)
            .await
            .map_err(|e| map_backend_error(e, context()))?;
        let fields = fields_from_columns(statement.columns());

        let params = Self::bind_params(values);
        let row_stream = client
            .query_raw(&statement, params)
            .await
            .map_err(|e| map_backend_error(e, context()))?;
        pin_mut!(row_stream);

        let mut decoded_rows = Vec::new();
        while let Some(row) = row_stream
            .try_next()
            .await
            .map_err(|e| map_backend_error(e, context()))?
        {
            decoded_rows.push(decode_row(&row, &registry));
        }

        // `Client::query`/`query_raw` never hand back the backend's
        // `CommandComplete` tag directly, but `RowStream` tracks the row
        // count it carries; that, not the decoded row-array length, is the
        // correct count for an `UPDATE`/`DELETE` with no `RETURNING`.
        let row_count = row_stream.rows_affected();

        Ok(QueryResult {
            command: command_from_sql(sql),
            row_count,
            fields,
            rows: decoded_rows,
        })
    }

    fn stream<'a>(
        &'a mut self,
        sql: &'a str,
        values: &'a [Value],
    ) -> BoxStream<'a, Result<StreamItem, PgShapeError>> {
        let attempt = async move {
            let registry = self.registry().await?;
            let client = self.client()?;
            let params = Self::bind_params(values);

            let row_stream = client.query_raw(sql, params).await.map_err(|e| {
                map_backend_error(
                    e,
                    QueryContext {
                        sql: sql.to_string(),
                        values: values.to_vec(),
                    },
                )
            })?;

            let fields_seen: Arc<Mutex<Option<Vec<Field>>>> = Arc::new(Mutex::new(None));

            let mapped = row_stream.then(move |item| {
                let registry = registry.clone();
                let fields_seen = fields_seen.clone();
                async move {
                    match item {
                        Ok(row) => {
                            let mut guard = fields_seen.lock().await;
                            if guard.is_none() {
                                *guard = Some(fields_from_row(&row));
                            }
                            let fields = guard.clone().unwrap_or_default();
                            Ok(StreamItem {
                                fields,
                                row: decode_row(&row, &registry),
                            })
                        }
                        Err(e) => Err(map_backend_error(
                            e,
                            QueryContext {
                                sql: sql.to_string(),
                                values: values.to_vec(),
                            },
                        )),
                    }
                }
            });

            Ok::<_, PgShapeError>(mapped)
        };

        futures_util::stream::once(attempt).try_flatten().boxed()
    }

    fn take_notice_receiver(&mut self) -> Option<UnboundedReceiver<NoticeEvent>> {
        self.notice_rx.take()
    }
}

/// Spawns the `tokio_postgres::Connection` future that drives the socket's
/// I/O, forwarding `AsyncMessage::Notice` onto a fresh channel. Generic over
/// the socket/TLS-stream types so the TLS and plaintext `connect()` branches
/// — which produce different concrete `Connection<S, T>` instantiations —
/// can share one spawn path instead of duplicating the poll loop.
fn spawn_connection_driver<S, T>(
    mut connection: tokio_postgres::Connection<S, T>,
) -> (UnboundedReceiver<NoticeEvent>, tokio::task::JoinHandle<()>)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx): (UnboundedSender<NoticeEvent>, _) = mpsc::unbounded_channel();

    let io_task = tokio::spawn(async move {
        loop {
            match futures_util::future::poll_fn(|cx| connection.poll_message(cx)).await {
                Some(Ok(AsyncMessage::Notice(notice))) => {
                    let message = notice.message().to_string();
                    if !message.is_empty() {
                        let _ = tx.send(NoticeEvent { message });
                    }
                }
                Some(Ok(AsyncMessage::Notification(_))) => {
                    log::debug!("received backend notification outside notice channel scope");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::error!("connection I/O task terminated: {e}");
                    break;
                }
                None => break,
            }
        }
    });

    (rx, io_task)
}

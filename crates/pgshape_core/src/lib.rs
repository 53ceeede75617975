mod config;
mod connection;
mod error;
mod query_id;
mod result;
pub mod shape;
mod value;

pub use config::{ClientConfiguration, ConnectionUri, DsnSslMode, SslPolicy, Timeout, TypeParser};
pub use connection::{Connection, NoticeEvent};
pub use error::{BoxedSource, PgShapeError, QueryContext};
pub use query_id::QueryId;
pub use result::{Command, Field, QueryResult, Row, StreamItem};
pub use value::Value;

mod config_map;
mod connection;
mod error_map;
mod sql_param;
mod type_registry;
mod value_codec;

pub use config_map::{MappedConfig, map_client_configuration};
pub use connection::{PostgresConnection, PostgresDriver};
pub use error_map::map_backend_error;
pub use type_registry::TypeRegistry;

use crate::Value;

/// One axis of the three timeout policies a connection can be configured
/// with. `0` and `Disable` are distinct inputs that collapse to the same
/// outcome downstream: the underlying driver treats `0` as "no timeout",
/// which `Disable` already expresses, so the configuration mapper remaps
/// `Milliseconds(0)` to `Milliseconds(1)` rather than letting it fall
/// through to "no timeout" by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Milliseconds(u64),
    Disable,
}

impl Timeout {
    /// Applies the "0 becomes 1, `Disable` omits the field" remapping rule
    /// that all three timeout axes share.
    pub fn remap(self) -> Option<u64> {
        match self {
            Timeout::Disable => None,
            Timeout::Milliseconds(0) => Some(1),
            Timeout::Milliseconds(ms) => Some(ms),
        }
    }
}

/// SSL policy, independent of whatever the DSN's `sslmode` query parameter
/// says. `None` here means "no explicit override"; the DSN-derived mode
/// still applies in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslPolicy {
    Disable,
    Require,
    NoVerify,
}

/// SSL mode as carried in the connection URI itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DsnSslMode {
    #[default]
    Unset,
    Disable,
    Require,
    NoVerify,
}

/// The connection URI, already broken into its constituent fields by the
/// DSN parser (an external collaborator — this core never parses a URI
/// string itself).
#[derive(Debug, Clone)]
pub struct ConnectionUri {
    pub host: String,
    pub port: u16,
    pub database_name: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: DsnSslMode,
    pub application_name: Option<String>,
    pub options: Option<String>,
}

/// A single named type decoder a caller wants installed into the driver
/// before it runs any query. `name` is the backend's `pg_type.typname`;
/// `parse` decodes one wire-format cell into a [`Value`].
#[derive(Clone)]
pub struct TypeParser {
    pub name: String,
    pub parse: std::sync::Arc<dyn Fn(&str) -> Value + Send + Sync>,
}

impl std::fmt::Debug for TypeParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeParser").field("name", &self.name).finish_non_exhaustive()
    }
}

impl TypeParser {
    pub fn new(name: impl Into<String>, parse: impl Fn(&str) -> Value + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            parse: std::sync::Arc::new(parse),
        }
    }
}

/// Immutable input bundle a caller hands to the driver factory. Everything
/// the driver adapter and configuration mapper need is reachable from here;
/// nothing about it is derived from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfiguration {
    pub connection_uri: ConnectionUri,
    pub ssl: Option<SslPolicy>,
    pub connection_timeout: Timeout,
    pub statement_timeout: Timeout,
    pub idle_in_transaction_session_timeout: Timeout,
    pub type_parsers: Vec<TypeParser>,
}

impl ClientConfiguration {
    pub fn new(connection_uri: ConnectionUri) -> Self {
        Self {
            connection_uri,
            ssl: None,
            connection_timeout: Timeout::Milliseconds(5_000),
            statement_timeout: Timeout::Disable,
            idle_in_transaction_session_timeout: Timeout::Disable,
            type_parsers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_remaps_to_one_millisecond() {
        assert_eq!(Timeout::Milliseconds(0).remap(), Some(1));
    }

    #[test]
    fn disable_sentinel_omits_the_field() {
        assert_eq!(Timeout::Disable.remap(), None);
    }

    #[test]
    fn ordinary_value_passes_through() {
        assert_eq!(Timeout::Milliseconds(30_000).remap(), Some(30_000));
    }
}

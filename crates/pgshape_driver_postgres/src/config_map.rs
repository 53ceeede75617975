//! Translates [`ClientConfiguration`] into a [`MappedConfig`]: a
//! `tokio_postgres::Config` plus the `SET` statements the three timeout axes
//! become, since that crate has no field for them beyond the TCP-level
//! connect timeout.

use pgshape_core::{ClientConfiguration, DsnSslMode, SslPolicy};

/// The pure output of the configuration mapper. `config` drives
/// `tokio_postgres::connect`; `post_connect_statements` must be issued, in
/// order, immediately after `connect()` succeeds and before the caller's
/// first query.
#[derive(Debug, Clone)]
pub struct MappedConfig {
    pub config: tokio_postgres::Config,
    pub tls_required: bool,
    pub tls_accept_invalid_certs: bool,
    pub post_connect_statements: Vec<String>,
}

/// Resolves the effective SSL mode: an explicit [`SslPolicy`] on the client
/// configuration overrides whatever the DSN itself carried.
fn resolve_ssl(explicit: Option<SslPolicy>, dsn_mode: DsnSslMode) -> (bool, bool) {
    if let Some(policy) = explicit {
        return match policy {
            SslPolicy::Disable => (false, false),
            SslPolicy::Require => (true, false),
            SslPolicy::NoVerify => (true, true),
        };
    }

    match dsn_mode {
        DsnSslMode::Unset | DsnSslMode::Disable => (false, false),
        DsnSslMode::Require => (true, false),
        DsnSslMode::NoVerify => (true, true),
    }
}

pub fn map_client_configuration(configuration: &ClientConfiguration) -> MappedConfig {
    let uri = &configuration.connection_uri;

    let mut config = tokio_postgres::Config::new();
    config
        .host(&uri.host)
        .port(uri.port)
        .dbname(&uri.database_name)
        .user(&uri.username)
        .password(&uri.password);

    if let Some(application_name) = &uri.application_name {
        config.application_name(application_name);
    }
    if let Some(options) = &uri.options {
        config.options(options);
    }

    if let Some(connect_timeout_ms) = configuration.connection_timeout.remap() {
        config.connect_timeout(std::time::Duration::from_millis(connect_timeout_ms));
    }

    let (tls_required, tls_accept_invalid_certs) = resolve_ssl(configuration.ssl, uri.ssl_mode);

    let mut post_connect_statements = Vec::new();
    if let Some(statement_timeout_ms) = configuration.statement_timeout.remap() {
        post_connect_statements.push(format!("SET statement_timeout = {statement_timeout_ms}"));
    }
    if let Some(idle_timeout_ms) = configuration
        .idle_in_transaction_session_timeout
        .remap()
    {
        post_connect_statements
            .push(format!("SET idle_in_transaction_session_timeout = {idle_timeout_ms}"));
    }

    MappedConfig {
        config,
        tls_required,
        tls_accept_invalid_certs,
        post_connect_statements,
    }
}

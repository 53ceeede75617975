use pgshape_core::{
    ClientConfiguration, Connection, ConnectionUri, DsnSslMode, PgShapeError, QueryId, TypeParser,
    Value, shape,
};
use pgshape_driver_postgres::PostgresDriver;
use pgshape_test_support::containers;
use std::time::Duration;

fn configuration_for(uri: &str, type_parsers: Vec<TypeParser>) -> ClientConfiguration {
    let parsed: tokio_postgres::Config = uri.parse().expect("valid postgres connection uri");
    let host = parsed
        .get_hosts()
        .first()
        .map(|h| match h {
            tokio_postgres::config::Host::Tcp(hostname) => hostname.clone(),
            #[cfg(unix)]
            _ => "localhost".to_string(),
        })
        .unwrap_or_else(|| "localhost".to_string());
    let port = parsed.get_ports().first().copied().unwrap_or(5432);

    let mut configuration = ClientConfiguration::new(ConnectionUri {
        host,
        port,
        database_name: "postgres".to_string(),
        username: "postgres".to_string(),
        password: "postgres".to_string(),
        ssl_mode: DsnSslMode::Disable,
        application_name: None,
        options: None,
    });
    configuration.type_parsers = type_parsers;
    configuration
}

async fn connect_with(
    driver: &PostgresDriver,
) -> Result<pgshape_driver_postgres::PostgresConnection, PgShapeError> {
    let mut connection = driver.connection();
    connection.connect().await?;
    Ok(connection)
}

async fn connect(uri: &str) -> Result<pgshape_driver_postgres::PostgresConnection, PgShapeError> {
    let driver = PostgresDriver::new(configuration_for(uri, Vec::new()));
    connect_with(&driver).await
}

fn run_against_live_postgres<F, Fut>(test: F)
where
    F: FnOnce(String) -> Fut,
    Fut: std::future::Future<Output = Result<(), PgShapeError>>,
{
    let outcome = containers::with_postgres_url(|uri| {
        let rt = tokio::runtime::Runtime::new().expect("build tokio runtime");
        rt.block_on(test(uri))
    });

    outcome.expect("live integration scenario succeeds");
}

#[test]
#[ignore = "requires Docker daemon"]
fn connect_query_and_shape_roundtrip() {
    run_against_live_postgres(|uri| async move {
        let mut connection =
            containers::retry_db_operation(Duration::from_secs(30), || connect(&uri)).await?;

        let rows = shape::any(&mut connection, "select 1 as one", &[], None).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("one"), Some(&Value::Int(1)));

        let value = shape::one_first(&mut connection, "select 1 as one", &[], None).await?;
        assert_eq!(value, Value::Int(1));

        connection.end().await?;
        Ok(())
    });
}

#[test]
#[ignore = "requires Docker daemon"]
fn one_raises_not_found_against_a_live_backend() {
    run_against_live_postgres(|uri| async move {
        let mut connection =
            containers::retry_db_operation(Duration::from_secs(30), || connect(&uri)).await?;

        let inherited = QueryId::inherit_or_new(None);
        let err = shape::one(&mut connection, "select 1 where false", &[], Some(inherited))
            .await
            .unwrap_err();

        match err {
            PgShapeError::NotFound { query_id } => assert_eq!(query_id, inherited),
            other => panic!("expected NotFound, got {other:?}"),
        }

        Ok(())
    });
}

#[test]
#[ignore = "requires Docker daemon"]
fn input_syntax_errors_are_mapped() {
    run_against_live_postgres(|uri| async move {
        let mut connection =
            containers::retry_db_operation(Duration::from_secs(30), || connect(&uri)).await?;

        let err = connection.query("select ***", &[]).await.unwrap_err();
        assert!(matches!(err, PgShapeError::InputSyntax { .. }));

        Ok(())
    });
}

#[test]
#[ignore = "requires Docker daemon"]
fn stream_delivers_rows_in_order() {
    use futures_util::StreamExt;

    run_against_live_postgres(|uri| async move {
        let mut connection =
            containers::retry_db_operation(Duration::from_secs(30), || connect(&uri)).await?;

        let mut seen = Vec::new();
        {
            let mut stream = connection.stream("select generate_series(1, 3) as n", &[]);
            while let Some(item) = stream.next().await {
                let item = item?;
                seen.push(item.row.get("n").cloned());
            }
        }

        assert_eq!(
            seen,
            vec![Some(Value::Int(1)), Some(Value::Int(2)), Some(Value::Int(3))]
        );

        Ok(())
    });
}

#[test]
#[ignore = "requires Docker daemon"]
fn custom_type_parser_decodes_registered_type() {
    run_against_live_postgres(|uri| async move {
        let upper_text = TypeParser::new("text", |raw: &str| Value::Text(raw.to_uppercase()));
        let driver = PostgresDriver::new(configuration_for(&uri, vec![upper_text]));

        let mut connection =
            containers::retry_db_operation(Duration::from_secs(30), || connect_with(&driver)).await?;

        let value =
            shape::one_first(&mut connection, "select 'hello' as greeting", &[], None).await?;
        assert_eq!(value, Value::Text("HELLO".to_string()));

        Ok(())
    });
}

//! The nine query-shape methods, expressed as composition over a shared
//! `run` primitive plus two predicates and one projection.

use crate::{Connection, PgShapeError, QueryId, QueryResult, Row, Value};

/// Row-count contract a shape method enforces against the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowCountContract {
    Any,
    AtMostOne,
    AtLeastOne,
    ExactlyOne,
}

/// Column-count contract a shape method enforces against the first row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnCountContract {
    Any,
    ExactlyOne,
}

fn check_row_count(
    rows: &[Row],
    contract: RowCountContract,
    query_id: QueryId,
) -> Result<(), PgShapeError> {
    let ok = match contract {
        RowCountContract::Any => true,
        RowCountContract::AtMostOne => rows.len() <= 1,
        RowCountContract::AtLeastOne => !rows.is_empty(),
        RowCountContract::ExactlyOne => rows.len() == 1,
    };

    if ok {
        return Ok(());
    }

    if rows.is_empty() {
        let err = PgShapeError::not_found(query_id);
        log_shape_error(query_id, &err);
        Err(err)
    } else {
        let err = PgShapeError::data_integrity(
            query_id,
            format!("expected at most one row, received {}", rows.len()),
        );
        log_shape_error(query_id, &err);
        Err(err)
    }
}

fn check_column_count(
    row: &Row,
    contract: ColumnCountContract,
    query_id: QueryId,
) -> Result<(), PgShapeError> {
    match contract {
        ColumnCountContract::Any => Ok(()),
        ColumnCountContract::ExactlyOne => {
            if row.is_empty() {
                let err = PgShapeError::data_integrity(query_id, "result row has no columns");
                log_shape_error(query_id, &err);
                return Err(err);
            }
            if row.len() != 1 {
                let err = PgShapeError::data_integrity(
                    query_id,
                    format!("expected exactly one column, received {}", row.len()),
                );
                log_shape_error(query_id, &err);
                return Err(err);
            }
            Ok(())
        }
    }
}

/// Reads the first entry in the row's declared column order (`Row` is an
/// `IndexMap`, so insertion order is declaration order).
fn project_first_column(row: &Row) -> Value {
    row.iter()
        .next()
        .map(|(_, v)| v.clone())
        .unwrap_or(Value::Null)
}

fn log_shape_error(query_id: QueryId, err: &PgShapeError) {
    if let Some(label) = err.shape_log_label() {
        log::error!("[{query_id}] {label}: {err}");
    }
}

/// Shared primitive every one of the nine entry points dispatches through:
/// derives or inherits the query-id, runs the statement, and hands back both
/// the raw result and the id so callers can thread it into their own shape
/// checks without re-deriving it.
async fn run(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<(QueryResult, QueryId), PgShapeError> {
    let query_id = QueryId::inherit_or_new(inherited_query_id);
    log::debug!("[{query_id}] executing query: {sql}");
    let result = connection.query(sql, values).await?;
    Ok((result, query_id))
}

/// `query` — the zero-contract member of the mixin family: returns the raw
/// result, propagating mapped driver errors unchanged.
pub async fn query(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<QueryResult, PgShapeError> {
    let (result, _) = run(connection, sql, values, inherited_query_id).await?;
    Ok(result)
}

/// `any` — any row count, any column count; returns rows unchanged.
pub async fn any(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Vec<Row>, PgShapeError> {
    let (result, _) = run(connection, sql, values, inherited_query_id).await?;
    Ok(result.rows)
}

/// `maybeOne` — zero or one row; returns the row or `None`.
pub async fn maybe_one(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Option<Row>, PgShapeError> {
    let (result, query_id) = run(connection, sql, values, inherited_query_id).await?;
    check_row_count(&result.rows, RowCountContract::AtMostOne, query_id)?;
    Ok(result.rows.into_iter().next())
}

/// `one` — exactly one row; `NotFound` on zero, `DataIntegrity` on more than
/// one.
pub async fn one(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Row, PgShapeError> {
    let (result, query_id) = run(connection, sql, values, inherited_query_id).await?;
    check_row_count(&result.rows, RowCountContract::ExactlyOne, query_id)?;
    Ok(result.rows.into_iter().next().expect("checked exactly one row"))
}

/// `many` — one or more rows; `NotFound` on zero.
pub async fn many(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Vec<Row>, PgShapeError> {
    let (result, query_id) = run(connection, sql, values, inherited_query_id).await?;
    check_row_count(&result.rows, RowCountContract::AtLeastOne, query_id)?;
    Ok(result.rows)
}

/// `anyFirst` — any row count, exactly one column per row (when any rows are
/// present); returns the ordered sequence of first-column values.
pub async fn any_first(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Vec<Value>, PgShapeError> {
    let (result, query_id) = run(connection, sql, values, inherited_query_id).await?;
    if let Some(first_row) = result.rows.first() {
        check_column_count(first_row, ColumnCountContract::ExactlyOne, query_id)?;
    }
    Ok(result.rows.iter().map(project_first_column).collect())
}

/// `maybeOneFirst` — zero or one row, exactly one column.
pub async fn maybe_one_first(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Option<Value>, PgShapeError> {
    let (result, query_id) = run(connection, sql, values, inherited_query_id).await?;
    check_row_count(&result.rows, RowCountContract::AtMostOne, query_id)?;
    match result.rows.first() {
        Some(row) => {
            check_column_count(row, ColumnCountContract::ExactlyOne, query_id)?;
            Ok(Some(project_first_column(row)))
        }
        None => Ok(None),
    }
}

/// `oneFirst` — exactly one row, exactly one column.
pub async fn one_first(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Value, PgShapeError> {
    let (result, query_id) = run(connection, sql, values, inherited_query_id).await?;
    check_row_count(&result.rows, RowCountContract::ExactlyOne, query_id)?;
    let row = result.rows.first().expect("checked exactly one row");
    check_column_count(row, ColumnCountContract::ExactlyOne, query_id)?;
    Ok(project_first_column(row))
}

/// `manyFirst` — one or more rows, exactly one column.
pub async fn many_first(
    connection: &mut dyn Connection,
    sql: &str,
    values: &[Value],
    inherited_query_id: Option<QueryId>,
) -> Result<Vec<Value>, PgShapeError> {
    let (result, query_id) = run(connection, sql, values, inherited_query_id).await?;
    check_row_count(&result.rows, RowCountContract::AtLeastOne, query_id)?;
    if let Some(first_row) = result.rows.first() {
        check_column_count(first_row, ColumnCountContract::ExactlyOne, query_id)?;
    }
    Ok(result.rows.iter().map(project_first_column).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgshape_test_support::{FakeConnection, row};

    fn rows(n: usize) -> Vec<Row> {
        (0..n).map(|i| row([("foo", Value::Int(i as i64))])).collect()
    }

    #[tokio::test]
    async fn one_returns_the_single_row() {
        let mut conn = FakeConnection::with_rows(rows(1));
        let result = one(&mut conn, "select", &[], None).await.unwrap();
        assert_eq!(result.get("foo"), Some(&Value::Int(0)));
    }

    #[tokio::test]
    async fn one_raises_not_found_on_zero_rows() {
        let mut conn = FakeConnection::with_rows(rows(0));
        let err = one(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn one_raises_data_integrity_on_multiple_rows() {
        let mut conn = FakeConnection::with_rows(rows(2));
        let err = one(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn maybe_one_returns_none_on_zero_rows() {
        let mut conn = FakeConnection::with_rows(rows(0));
        assert_eq!(maybe_one(&mut conn, "select", &[], None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn maybe_one_returns_some_on_one_row() {
        let mut conn = FakeConnection::with_rows(rows(1));
        assert!(maybe_one(&mut conn, "select", &[], None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn maybe_one_raises_data_integrity_on_multiple_rows() {
        let mut conn = FakeConnection::with_rows(rows(2));
        let err = maybe_one(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn many_raises_not_found_on_zero_rows() {
        let mut conn = FakeConnection::with_rows(rows(0));
        let err = many(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn many_returns_rows_unchanged() {
        let mut conn = FakeConnection::with_rows(rows(3));
        assert_eq!(many(&mut conn, "select", &[], None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn maybe_one_first_returns_value_for_single_row() {
        let mut conn = FakeConnection::with_rows(rows(1));
        assert_eq!(
            maybe_one_first(&mut conn, "select", &[], None).await.unwrap(),
            Some(Value::Int(0))
        );
    }

    #[tokio::test]
    async fn maybe_one_first_returns_none_for_zero_rows() {
        let mut conn = FakeConnection::with_rows(rows(0));
        assert_eq!(maybe_one_first(&mut conn, "select", &[], None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn maybe_one_first_raises_data_integrity_on_multiple_rows() {
        let mut conn = FakeConnection::with_rows(rows(2));
        let err = maybe_one_first(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn maybe_one_first_raises_data_integrity_on_two_columns() {
        let mut conn = FakeConnection::with_rows(vec![row([
            ("bar", Value::Int(1)),
            ("foo", Value::Int(1)),
        ])]);
        let err = maybe_one_first(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn any_first_projects_every_row_in_order() {
        let mut conn = FakeConnection::with_rows(rows(3));
        let values = any_first(&mut conn, "select", &[], None).await.unwrap();
        assert_eq!(values, vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
    }

    #[tokio::test]
    async fn any_first_raises_data_integrity_when_first_row_has_two_columns() {
        let mut conn = FakeConnection::with_rows(vec![row([
            ("bar", Value::Int(1)),
            ("foo", Value::Int(1)),
        ])]);
        let err = any_first(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn one_first_raises_not_found_on_zero_rows() {
        let mut conn = FakeConnection::with_rows(rows(0));
        let err = one_first(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn many_first_raises_not_found_on_zero_rows() {
        let mut conn = FakeConnection::with_rows(rows(0));
        let err = many_first(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn many_first_raises_data_integrity_on_wrong_column_count() {
        let mut conn = FakeConnection::with_rows(vec![row([
            ("bar", Value::Int(1)),
            ("foo", Value::Int(1)),
        ])]);
        let err = many_first(&mut conn, "select", &[], None).await.unwrap_err();
        assert!(matches!(err, PgShapeError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn inherited_query_id_propagates_into_raised_errors() {
        let mut conn = FakeConnection::with_rows(rows(0));
        let inherited = QueryId::inherit_or_new(None);
        let err = one(&mut conn, "select", &[], Some(inherited)).await.unwrap_err();
        match err {
            PgShapeError::NotFound { query_id } => assert_eq!(query_id, inherited),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}

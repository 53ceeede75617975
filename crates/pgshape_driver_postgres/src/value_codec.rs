//! Reshapes `tokio_postgres::Row`s (and prepared-statement column metadata)
//! into `pgshape_core::{Row, Field}`, layering the installed `TypeRegistry`
//! decoders over a built-in set of well-known scalar OIDs. Grounded on the
//! teacher's own `postgres_value_to_value` column-type match, generalized to
//! consult the registry first.

use pgshape_core::{Command, Field, Row as DecodedRow, Value};
use tokio_postgres::types::FromSql;
use tokio_postgres::{Column, Row as PgRow};

use crate::type_registry::TypeRegistry;

/// Catch-all cell reader used when a registered `TypeParser` claims an OID:
/// the registry's decoders operate on text, so every claimed column is read
/// back out as its raw textual representation regardless of the wire format
/// the backend chose, then handed to the decoder closure.
struct RawCell(Option<String>);

impl<'a> FromSql<'a> for RawCell {
    fn from_sql(
        _: &tokio_postgres::types::Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawCell(Some(String::from_utf8_lossy(raw).into_owned())))
    }

    fn from_sql_null(
        _: &tokio_postgres::types::Type,
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawCell(None))
    }

    fn accepts(_: &tokio_postgres::types::Type) -> bool {
        true
    }
}

/// Builds the declared column list straight from prepared-statement
/// metadata, so it is available even when the statement returns zero rows.
pub fn fields_from_columns(columns: &[Column]) -> Vec<Field> {
    columns
        .iter()
        .map(|column| Field {
            name: column.name().to_string(),
            data_type_id: column.type_().oid(),
        })
        .collect()
}

pub fn fields_from_row(row: &PgRow) -> Vec<Field> {
    fields_from_columns(row.columns())
}

pub fn decode_row(row: &PgRow, registry: &TypeRegistry) -> DecodedRow {
    let mut decoded = DecodedRow::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let oid = column.type_().oid();
        let value = match registry.decoder_for(oid) {
            Some(decoder) => match row.try_get::<_, RawCell>(idx) {
                Ok(RawCell(Some(text))) => decoder(&text),
                Ok(RawCell(None)) => Value::Null,
                Err(_) => Value::Null,
            },
            None => decode_builtin(row, idx, column.type_().name()),
        };
        decoded.insert(column.name().to_string(), value);
    }
    decoded
}

fn decode_builtin(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "bool" => row.try_get::<_, bool>(idx).map(Value::Bool).unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, i16>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, i32>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int8" => row.try_get::<_, i64>(idx).map(Value::Int).unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, f32>(idx)
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),
        "float8" | "numeric" => row.try_get::<_, f64>(idx).map(Value::Float).unwrap_or(Value::Null),
        "bytea" => row.try_get::<_, Vec<u8>>(idx).map(Value::Bytes).unwrap_or(Value::Null),
        "json" | "jsonb" => row
            .try_get::<_, serde_json::Value>(idx)
            .map(Value::Json)
            .unwrap_or(Value::Null),
        _ => row.try_get::<_, String>(idx).map(Value::Text).unwrap_or(Value::Null),
    }
}

fn command_from_verb(verb: &str) -> Command {
    match verb.to_ascii_uppercase().as_str() {
        "SELECT" => Command::Select,
        "INSERT" => Command::Insert,
        "UPDATE" => Command::Update,
        "DELETE" => Command::Delete,
        "COPY" => Command::Copy,
        "REFRESH" => Command::RefreshMaterializedView,
        _ => Command::Unknown,
    }
}

/// Infers the executed statement's command kind from its leading SQL
/// keyword. `Client::query`/`Client::query_raw` never hand back the
/// backend's `CommandComplete` tag the way `execute`/`simple_query` do, so
/// the statement text is the only signal left once the row set is already in
/// hand.
pub fn command_from_sql(sql: &str) -> Command {
    command_from_verb(sql.trim_start().split_whitespace().next().unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_sql_reads_the_leading_keyword() {
        assert_eq!(command_from_sql("select 1"), Command::Select);
        assert_eq!(
            command_from_sql("  INSERT into widgets (id) values (1) returning id"),
            Command::Insert
        );
        assert_eq!(command_from_sql("update widgets set id = 1"), Command::Update);
        assert_eq!(command_from_sql("vacuum widgets"), Command::Unknown);
    }
}

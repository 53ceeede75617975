//! A `ToSql` adapter over `pgshape_core::Value`, needed because neither this
//! crate nor `pgshape_core` owns both the trait and the type: the orphan
//! rule forces a thin wrapper rather than an `impl ToSql for Value` in
//! either crate.

use bytes::BytesMut;
use pgshape_core::Value;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

pub struct ValueParam<'a>(pub &'a Value);

/// Encodes an integer parameter at the width Postgres actually asked for
/// rather than always writing the 8-byte `int8` wire form: binding a wide
/// value against a narrower column (e.g. the ubiquitous `int4`/`serial`
/// primary key) is a bind-time protocol error, not just a waste of bytes.
fn int_to_sql(
    i: i64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    match *ty {
        Type::INT2 => (i as i16).to_sql(ty, out),
        Type::INT4 => (i as i32).to_sql(ty, out),
        _ => i.to_sql(ty, out),
    }
}

/// Same idea for floating-point parameters: `float4` columns expect a 4-byte
/// encoding, not the 8-byte `float8` form `f64::to_sql` always writes.
fn float_to_sql(
    f: f64,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
    match *ty {
        Type::FLOAT4 => (f as f32).to_sql(ty, out),
        _ => f.to_sql(ty, out),
    }
}

impl<'a> ToSql for ValueParam<'a> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => int_to_sql(*i, ty, out),
            Value::Float(f) => float_to_sql(*f, ty, out),
            Value::Text(s) => s.to_sql(ty, out),
            Value::Bytes(b) => b.to_sql(ty, out),
            Value::Json(j) => j.to_sql(ty, out),
            Value::Array(_) => Err("array-valued query parameters are not supported".into()),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

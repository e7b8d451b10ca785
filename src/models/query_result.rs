//! Query results and row decoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgRow, PgTypeInfo, PgTypeKind, PgValueFormat};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

use super::numeric::numeric_to_string;

/// A single result row keyed by column name, in SELECT order.
pub type Row = Map<String, Value>;

/// Rows returned by a query together with the server-reported row count.
///
/// `row_count` is the number of rows returned for `SELECT` and the number of
/// rows affected for `INSERT`/`UPDATE`/`DELETE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: u64,
}

impl QueryResult {
    pub fn into_parts(self) -> (Vec<Row>, u64) {
        (self.rows, self.row_count)
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}

impl From<QueryResult> for (Vec<Row>, u64) {
    fn from(result: QueryResult) -> Self {
        result.into_parts()
    }
}

/// Decode every column of a Postgres row into JSON values.
pub fn decode_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    let mut record = Map::with_capacity(row.len());

    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info())?;
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

fn decode_column(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let value = match type_info.name() {
        "BOOL" => Value::Bool(row.try_get(idx)?),
        "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
        "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
        "OID" => Value::from(row.try_get::<Oid, _>(idx)?.0),
        "FLOAT4" => float_value(f64::from(row.try_get::<f32, _>(idx)?)),
        "FLOAT8" => float_value(row.try_get(idx)?),
        "NUMERIC" => Value::String(match raw.format() {
            PgValueFormat::Binary => numeric_to_string(raw.as_bytes().map_err(sqlx::Error::Decode)?)
                .map_err(sqlx::Error::Decode)?,
            PgValueFormat::Text => raw.as_str().map_err(sqlx::Error::Decode)?.to_string(),
        }),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => Value::String(row.try_get(idx)?),
        "UUID" => Value::String(row.try_get::<uuid::Uuid, _>(idx)?.to_string()),
        "JSON" | "JSONB" => row.try_get(idx)?,
        "TIMESTAMPTZ" => Value::String(row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339()),
        "TIMESTAMP" => Value::String(naive_datetime_string(row.try_get(idx)?)),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        "BYTEA" => Value::String(bytea_string(&row.try_get::<Vec<u8>, _>(idx)?)),
        name if name.ends_with("[]") => decode_array(row, idx, name).unwrap_or_else(|e| {
            tracing::debug!(column = idx, type_name = name, error = %e, "Undecodable array, returning null");
            Value::Null
        }),
        // Enum labels and citext are sent as plain UTF-8 even in binary format.
        _ if is_text_like(type_info) => Value::String(row.try_get_unchecked(idx)?),
        other => {
            tracing::debug!(column = idx, type_name = other, "Unsupported column type, returning null");
            Value::Null
        }
    };

    Ok(value)
}

/// One-dimensional arrays of the scalar types above.
fn decode_array(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "BOOL[]" => json_array(row.try_get::<Vec<Option<bool>>, _>(idx)?),
        "INT2[]" => json_array(row.try_get::<Vec<Option<i16>>, _>(idx)?),
        "INT4[]" => json_array(row.try_get::<Vec<Option<i32>>, _>(idx)?),
        "INT8[]" => json_array(row.try_get::<Vec<Option<i64>>, _>(idx)?),
        "FLOAT4[]" => json_array(row.try_get::<Vec<Option<f32>>, _>(idx)?),
        "FLOAT8[]" => json_array(row.try_get::<Vec<Option<f64>>, _>(idx)?),
        "TEXT[]" | "VARCHAR[]" => json_array(row.try_get::<Vec<Option<String>>, _>(idx)?),
        "UUID[]" => json_array(
            row.try_get::<Vec<Option<uuid::Uuid>>, _>(idx)?
                .into_iter()
                .map(|v| v.map(|id| id.to_string()))
                .collect(),
        ),
        other => return Err(sqlx::Error::Decode(format!("unsupported array type {other}").into())),
    };

    Ok(value)
}

fn is_text_like(type_info: &PgTypeInfo) -> bool {
    type_info.name().eq_ignore_ascii_case("citext") || matches!(type_info.kind(), PgTypeKind::Enum(_))
}

fn json_array<T: Into<Value>>(items: Vec<Option<T>>) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map_or(Value::Null, Into::into))
            .collect(),
    )
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

fn naive_datetime_string(v: NaiveDateTime) -> String {
    v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

fn bytea_string(bytes: &[u8]) -> String {
    format!("\\x{}", hex::encode(bytes))
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Physical connections currently open.
    pub size: u32,
    pub idle: u32,
    pub in_use: u32,
    pub max_connections: u32,
}

impl PoolStats {
    pub fn new(size: u32, idle: u32, max_connections: u32) -> Self {
        Self {
            size,
            idle,
            in_use: size.saturating_sub(idle),
            max_connections,
        }
    }
}

//! Generic Postgres row -> JSON conversion for the COPY step (spec §4.4).
//! The nineteen hot tables have different shapes, so rather than hand-write
//! nineteen typed `SELECT`s just to re-serialize them as JSON for Arrow
//! schema inference, COPY reads rows dynamically off `PgRow`'s column
//! metadata the way a generic ETL bridge does.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgRow, PgTypeInfo};
use sqlx::{Column, Row, TypeInfo};

pub fn row_to_json(row: &PgRow) -> Value {
    let mut map = Map::with_capacity(row.columns().len());
    for (i, col) in row.columns().iter().enumerate() {
        let name = col.name().to_string();
        let value = decode_column(row, i, col.type_info());
        map.insert(name, value);
    }
    Value::Object(map)
}

fn decode_column(row: &PgRow, i: usize, ty: &PgTypeInfo) -> Value {
    match ty.name() {
        "BOOL" => row.try_get::<Option<bool>, _>(i).ok().flatten().map(Value::Bool).unwrap_or(Value::Null),
        "INT2" => opt_number(row.try_get::<Option<i16>, _>(i).ok().flatten().map(|v| v as i64)),
        "INT4" => opt_number(row.try_get::<Option<i32>, _>(i).ok().flatten().map(|v| v as i64)),
        "INT8" => opt_number(row.try_get::<Option<i64>, _>(i).ok().flatten()),
        "TEXT" | "VARCHAR" | "BPCHAR" => {
            row.try_get::<Option<String>, _>(i).ok().flatten().map(Value::String).unwrap_or(Value::Null)
        }
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(i)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        "JSONB" | "JSON" => row.try_get::<Option<Value>, _>(i).ok().flatten().unwrap_or(Value::Null),
        "TEXT[]" | "_TEXT" => row
            .try_get::<Option<Vec<String>>, _>(i)
            .ok()
            .flatten()
            .map(|v| Value::Array(v.into_iter().map(Value::String).collect()))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn opt_number(v: Option<i64>) -> Value {
    v.map(|v| Value::Number(Number::from(v))).unwrap_or(Value::Null)
}

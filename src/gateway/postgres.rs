use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, Postgres};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{Column, Connection, Row, TypeInfo};

use crate::config::DbConfig;
use crate::error::{FetchError, FetchStage};
use crate::frame::{Frame, Scalar};
use crate::logging::{self, obj, query_fingerprint, v_num, v_str, Domain, ProfileScope};

use super::Gateway;

/// Postgres gateway: one connection per query, closed before returning.
pub struct PgGateway {
    cfg: DbConfig,
}

impl PgGateway {
    pub fn new(cfg: DbConfig) -> Self {
        Self { cfg }
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.cfg.host)
            .port(self.cfg.port)
            .database(&self.cfg.name)
            .username(&self.cfg.user)
            .password(&self.cfg.password)
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn query(&self, sql: &str) -> Result<Frame, FetchError> {
        let query_id = query_fingerprint(sql);
        let scope = ProfileScope::with_context("pg_query", &[("query_id", v_str(&query_id))]);

        let mut conn = PgConnection::connect_with(&self.connect_options())
            .await
            .map_err(|e| {
                logging::error(
                    Domain::Db,
                    "db.connect_failed",
                    obj(&[
                        ("host", v_str(&self.cfg.host)),
                        ("port", v_num(self.cfg.port as f64)),
                        ("database", v_str(&self.cfg.name)),
                        ("msg", v_str(&e.to_string())),
                    ]),
                );
                FetchError::connect(e)
            })?;

        let fetched = sqlx::query(sql).persistent(false).fetch_all(&mut conn).await;
        let closed = conn.close().await;

        let rows = fetched.map_err(FetchError::execute)?;
        closed.map_err(|e| FetchError::new(FetchStage::Close, e))?;
        let frame = decode_rows(&rows)?;

        logging::log(
            logging::Level::Debug,
            Domain::Db,
            "db.query",
            obj(&[
                ("query_id", v_str(&query_id)),
                ("sql", v_str(sql)),
                ("rows", v_num(frame.len() as f64)),
                ("elapsed_ms", v_num(scope.elapsed_ms())),
            ]),
        );
        Ok(frame)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

fn decode_rows(rows: &[PgRow]) -> Result<Frame, FetchError> {
    // Column names come from the first row; an empty result has none.
    let Some(first) = rows.first() else {
        return Ok(Frame::default());
    };
    let columns = first.columns().iter().map(|c| c.name().to_string()).collect();
    let mut frame = Frame::new(columns);
    for row in rows {
        let mut values = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            values.push(decode_cell(row, idx)?);
        }
        frame.push_row(values).map_err(FetchError::decode)?;
    }
    Ok(frame)
}

fn get<'r, T, F>(row: &'r PgRow, idx: usize, wrap: F) -> Result<Scalar, sqlx::Error>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    F: FnOnce(T) -> Scalar,
{
    Ok(row.try_get::<Option<T>, _>(idx)?.map(wrap).unwrap_or(Scalar::Null))
}

/// How a Postgres column is turned into a `Scalar`, keyed by the type
/// name sqlx reports (`CHAR` is bpchar, `"CHAR"` is the one-byte type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Bool,
    Text,
    Oid,
    Date,
    Timestamp,
    TimestampTz,
}

fn cell_kind(type_name: &str) -> Option<CellKind> {
    let kind = match type_name {
        "INT2" => CellKind::Int2,
        "INT4" => CellKind::Int4,
        "INT8" => CellKind::Int8,
        "FLOAT4" => CellKind::Float4,
        "FLOAT8" => CellKind::Float8,
        "NUMERIC" => CellKind::Numeric,
        "BOOL" => CellKind::Bool,
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "CITEXT" | "UNKNOWN" => CellKind::Text,
        "OID" => CellKind::Oid,
        "DATE" => CellKind::Date,
        "TIMESTAMP" => CellKind::Timestamp,
        "TIMESTAMPTZ" => CellKind::TimestampTz,
        _ => return None,
    };
    Some(kind)
}

fn decode_cell(row: &PgRow, idx: usize) -> Result<Scalar, FetchError> {
    let column = row.column(idx);
    let type_name = column.type_info().name();
    let Some(kind) = cell_kind(type_name) else {
        return Err(FetchError::decode(format!(
            "column `{}` has unsupported type {}",
            column.name(),
            type_name
        )));
    };
    let cell = match kind {
        CellKind::Int2 => get(row, idx, |v: i16| Scalar::Int(v.into())),
        CellKind::Int4 => get(row, idx, |v: i32| Scalar::Int(v.into())),
        CellKind::Int8 => get(row, idx, Scalar::Int),
        CellKind::Float4 => get(row, idx, |v: f32| Scalar::Float(v.into())),
        CellKind::Float8 => get(row, idx, Scalar::Float),
        CellKind::Numeric => get(row, idx, |v: Decimal| {
            v.to_f64().map(Scalar::Float).unwrap_or(Scalar::Null)
        }),
        CellKind::Bool => get(row, idx, Scalar::Bool),
        CellKind::Text => get(row, idx, Scalar::Text),
        CellKind::Oid => get(row, idx, |v: Oid| Scalar::Int(v.0.into())),
        CellKind::Date => get(row, idx, |v: NaiveDate| Scalar::Text(v.to_string())),
        CellKind::Timestamp => get(row, idx, |v: NaiveDateTime| Scalar::Text(v.to_string())),
        CellKind::TimestampTz => get(row, idx, |v: DateTime<Utc>| Scalar::Text(v.to_rfc3339())),
    };
    cell.map_err(FetchError::decode)
}

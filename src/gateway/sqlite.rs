use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::error::{FetchError, FetchStage};
use crate::frame::{Frame, Scalar};
use crate::logging::{self, obj, query_fingerprint, v_num, v_str, Domain, ProfileScope};

use super::Gateway;

/// Reads a local SQLite snapshot of the pre-aggregated tables.
///
/// The file is opened read-only for every query, so a missing snapshot is a
/// connect failure rather than a fresh empty database.
pub struct SqliteGateway {
    path: PathBuf,
}

impl SqliteGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Gateway for SqliteGateway {
    async fn query(&self, sql: &str) -> Result<Frame, FetchError> {
        let path = self.path.clone();
        let owned = sql.to_string();
        tokio::task::spawn_blocking(move || query_blocking(&path, &owned))
            .await
            .map_err(FetchError::execute)?
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

pub fn query_blocking(path: &Path, sql: &str) -> Result<Frame, FetchError> {
    let query_id = query_fingerprint(sql);
    let scope = ProfileScope::with_context("sqlite_query", &[("query_id", v_str(&query_id))]);

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(FetchError::connect)?;

    let frame = {
        let mut stmt = conn.prepare(sql).map_err(FetchError::execute)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut frame = Frame::new(columns);
        let mut rows = stmt.query([]).map_err(FetchError::execute)?;
        while let Some(row) = rows.next().map_err(FetchError::execute)? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value = match row.get_ref(idx).map_err(FetchError::decode)? {
                    ValueRef::Null => Scalar::Null,
                    ValueRef::Integer(v) => Scalar::Int(v),
                    ValueRef::Real(v) => Scalar::Float(v),
                    ValueRef::Text(t) => Scalar::Text(String::from_utf8_lossy(t).into_owned()),
                    ValueRef::Blob(_) => {
                        return Err(FetchError::decode(format!(
                            "column `{}` holds a blob",
                            frame.columns()[idx]
                        )))
                    }
                };
                values.push(value);
            }
            frame.push_row(values).map_err(FetchError::decode)?;
        }
        frame
    };
    conn.close()
        .map_err(|(_, e)| FetchError::new(FetchStage::Close, e))?;

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

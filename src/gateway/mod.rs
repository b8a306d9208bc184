//! Data access gateway.
//!
//! A gateway takes literal SQL text and hands back a `Frame`, or one
//! `FetchError` whatever failed underneath. Implementations open a fresh
//! connection per call and close it before returning; there is no pool,
//! no retry and no statement cache.

use async_trait::async_trait;

use crate::config::{Backend, Config};
use crate::error::FetchError;
use crate::frame::Frame;

pub mod memory;
pub mod postgres;
pub mod sqlite;

pub use memory::MemoryGateway;
pub use postgres::PgGateway;
pub use sqlite::SqliteGateway;

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn query(&self, sql: &str) -> Result<Frame, FetchError>;

    /// Backend name for log records.
    fn name(&self) -> &'static str;
}

pub fn from_config(cfg: &Config) -> Box<dyn Gateway> {
    match &cfg.backend {
        Backend::Postgres => Box::new(PgGateway::new(cfg.db.clone())),
        Backend::Sqlite { path } => Box::new(SqliteGateway::new(path)),
    }
}

use sea_query_binder::SqlxValues;
use sqlx::{Error as DbError, sqlite::SqliteRow};

use crate::Result;

mod collection;
mod database;
mod synclient;

pub use database::SqliteStore;

pub trait DbRow {
    fn id(&self) -> &str;
    fn from_row(row: &SqliteRow) -> std::result::Result<Self, DbError>
    where
        Self: Sized;
}

pub trait DbInit {
    fn init(&self) -> Result<()>;
}

/// A statement with its bound parameters.
pub type BoundSql = (String, SqlxValues);

/// One statement of a batched commit.
pub struct TxStatement {
    pub sql: String,
    pub values: SqlxValues,
    /// Zero affected rows rolls the whole batch back.
    pub must_match: bool,
}

impl TxStatement {
    pub fn new(
        (sql, values): BoundSql,
        must_match: bool,
    ) -> Self {
        Self {
            sql,
            values,
            must_match,
        }
    }
}

/// Bound statements for the writes of a batched commit.
pub trait DbStatement {
    type Item;

    fn insert_sql(
        &self,
        data: &Self::Item,
    ) -> Result<BoundSql>;

    fn update_sql(
        &self,
        data: &Self::Item,
    ) -> BoundSql;

    fn delete_sql(
        &self,
        id: &str,
    ) -> BoundSql;
}

//! Storage layer for post projects, their side tables, and automation flows.
//!
//! Provides an abstraction over different storage backends:
//! - `MemStore`: In-memory storage for tests and demos
//! - `SqliteStore`: SQLite for persistent deployments
//!
//! Multi-record writes go through [`ChangeSet`] and [`Store::commit`] so that
//! every side effect of one stage transition lands together or not at all.

mod change;
pub mod data;
mod db;
pub mod query;
mod store;

use std::error::Error;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

use crate::{CrosslistError, Result};

use query::*;

pub use change::{Change, ChangeSet, Record};
pub use db::{MemStore, SqliteStore};
pub use store::Store;

/// Maps database errors to CrosslistError.
pub(crate) fn map_db_err(err: impl Error) -> CrosslistError {
    CrosslistError::Store(err.to_string())
}

/// Identifiers for different storage collections.
#[derive(Debug, Clone, Copy, AsRefStr, PartialEq, Hash, Eq, EnumIter)]
pub enum StoreIden {
    /// Post projects.
    #[strum(serialize = "projects")]
    Projects,
    /// Research results (search and deep research).
    #[strum(serialize = "research")]
    Research,
    /// Processed images.
    #[strum(serialize = "images")]
    Images,
    /// Post history entries.
    #[strum(serialize = "posts")]
    Posts,
    /// Automation flows.
    #[strum(serialize = "flows")]
    Flows,
}

/// Paginated query result.
#[derive(Debug, Deserialize, Serialize)]
pub struct PageData<T> {
    /// Total number of matching records.
    pub count: usize,
    /// Current page number (1-based).
    pub page_num: usize,
    /// Total number of pages.
    pub page_count: usize,
    /// Number of records per page.
    pub page_size: usize,
    /// Records in the current page.
    pub rows: Vec<T>,
}

impl<T> PageData<T> {
    pub(crate) fn new(
        q: &Query,
        count: usize,
        rows: Vec<T>,
    ) -> Self {
        Self {
            count,
            page_num: q.skip() / q.page_size() + 1,
            page_count: count.div_ceil(q.page_size()),
            page_size: q.page_size(),
            rows,
        }
    }
}

/// Trait for types that can identify their storage collection.
pub trait DbCollectionIden {
    /// Returns the collection identifier for this type.
    fn iden() -> StoreIden;
}

/// Trait for database collection operations.
pub trait DbCollection: Send + Sync {
    /// The type of items stored in this collection.
    type Item;

    /// Checks if a record with the given ID exists.
    fn exists(
        &self,
        id: &str,
    ) -> Result<bool>;

    /// Finds a record by ID, `NotFound` when absent.
    fn find(
        &self,
        id: &str,
    ) -> Result<Self::Item>;

    /// Queries records with pagination and filtering.
    fn query(
        &self,
        query: &Query,
    ) -> Result<PageData<Self::Item>>;

    /// Creates a new record.
    fn create(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Updates an existing record.
    fn update(
        &self,
        data: &Self::Item,
    ) -> Result<bool>;

    /// Deletes a record by ID.
    fn delete(
        &self,
        id: &str,
    ) -> Result<bool>;
}

/// Applies a whole change set, all or nothing.
pub trait DbCommit: Send + Sync {
    fn commit(
        &self,
        changes: &ChangeSet,
    ) -> Result<()>;
}

/// Trait for database store initialization.
pub trait DbStore {
    /// Initializes the database and registers collections with the store.
    fn init(
        &self,
        s: &Store,
    ) -> Result<()>;
}

//! Backend-neutral query description: equality filters, ordering and paging.

use serde_json::Value as JsonValue;

/// Default page size.
pub const DEFAULT_LIMIT: usize = 100;
/// Largest page one query returns.
pub const MAX_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Query {
    filters: Vec<(String, JsonValue)>,
    order_by: Vec<(String, bool)>,
    limit: usize,
    offset: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self::new()
    }
}

impl Query {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    /// Adds an equality filter on `field`.
    pub fn filter(
        mut self,
        field: &str,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    /// Orders by `field`, descending when `rev` is set.
    pub fn order_by(
        mut self,
        field: &str,
        rev: bool,
    ) -> Self {
        self.order_by.push((field.to_string(), rev));
        self
    }

    pub fn limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    pub fn offset(
        mut self,
        offset: usize,
    ) -> Self {
        self.offset = offset;
        self
    }

    pub fn filters(&self) -> &[(String, JsonValue)] {
        &self.filters
    }

    pub fn orders(&self) -> &[(String, bool)] {
        &self.order_by
    }

    pub fn page_size(&self) -> usize {
        self.limit
    }

    pub fn skip(&self) -> usize {
        self.offset
    }
}

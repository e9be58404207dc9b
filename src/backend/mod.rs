//! Data Backend Layer
//!
//! Defines the abstract interface for the hosted relational data service.
//! Implementations: PostgREST over HTTP, in-memory.

mod memory;
mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendResult;

pub use memory::{MemoryBackend, Op};
pub use rest::RestBackend;

/// A raw backend row (a JSON object)
pub type Row = Value;

/// Row filter on one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
    In { column: String, values: Vec<String> },
}

/// Sort clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Select query: all filters must match, optional single ordering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<I, S>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.push(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    /// Evaluate the filters against a row held locally
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq { column, value } => field_str(row, column) == Some(value.as_str()),
            Filter::In { column, values } => field_str(row, column)
                .map(|v| values.iter().any(|candidate| candidate == v))
                .unwrap_or(false),
        })
    }
}

pub(crate) fn field_str<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

/// Primitive operations offered by the data service
///
/// All operations are async; rows travel as JSON objects.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// List rows matching the query
    async fn select(&self, table: &str, query: &Query) -> BackendResult<Vec<Row>>;

    /// Fetch one row by id; `BackendError::NotFound` when no row matches
    async fn select_single(&self, table: &str, id: &str) -> BackendResult<Row>;

    /// Insert a row and return it as persisted
    async fn insert(&self, table: &str, row: Row) -> BackendResult<Row>;

    /// Apply a partial patch to one row and return the updated row
    async fn update(&self, table: &str, id: &str, patch: Row) -> BackendResult<Row>;

    /// Delete one row by id
    async fn delete(&self, table: &str, id: &str) -> BackendResult<()>;
}

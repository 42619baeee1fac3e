//! Row-addressed tabular store.
//!
//! Rows are addressed by 0-based position within a table, header included:
//! row 0 is the header, the first data row is row 1. Callers own the
//! header offset; the store never skips rows on their behalf.

pub mod google;
pub mod memory;

use crate::error::FormsError;
use async_trait::async_trait;
use thiserror::Error;

pub use google::GoogleSheetsStore;
pub use memory::MemoryStore;

pub type Row = Vec<String>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table '{0}' does not exist")]
    MissingTable(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("row {index} is out of range for table '{table}'")]
    RowOutOfRange { table: String, index: usize },

    #[error("authentication with the store failed: {0}")]
    Auth(String),

    #[error("store request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Request(e.to_string())
    }
}

impl From<StoreError> for FormsError {
    fn from(e: StoreError) -> Self {
        FormsError::Upstream(e.to_string())
    }
}

#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError>;

    /// Creates the table with `header` as row 0.
    async fn create_table(&self, table: &str, header: &[String]) -> Result<(), StoreError>;

    async fn drop_table(&self, table: &str) -> Result<(), StoreError>;

    /// Every row, header included.
    async fn read_rows(&self, table: &str) -> Result<Vec<Row>, StoreError>;

    async fn append_row(&self, table: &str, row: Row) -> Result<(), StoreError>;

    /// Overwrites the row at `index` in place.
    async fn write_row(&self, table: &str, index: usize, row: Row) -> Result<(), StoreError>;

    /// Removes the row at `index`; later rows shift up by one.
    async fn delete_row(&self, table: &str, index: usize) -> Result<(), StoreError>;
}

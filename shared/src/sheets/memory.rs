use super::{Row, StoreError, TabularStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process stand-in for the spreadsheet. Same row semantics as the real
/// store, including rows shifting up after a delete.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `table`, header included.
    pub async fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.read().await.get(table).map(Vec::len)
    }

    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.contains_key(table))
    }

    async fn create_table(&self, table: &str, header: &[String]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        tables.insert(table.to_string(), vec![header.to_vec()]);
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))
    }

    async fn read_rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))
    }

    async fn append_row(&self, table: &str, row: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;
        rows.push(row);
        Ok(())
    }

    async fn write_row(&self, table: &str, index: usize, row: Row) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;
        let slot = rows.get_mut(index).ok_or_else(|| StoreError::RowOutOfRange {
            table: table.to_string(),
            index,
        })?;
        *slot = row;
        Ok(())
    }

    async fn delete_row(&self, table: &str, index: usize) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;
        if index >= rows.len() {
            return Err(StoreError::RowOutOfRange { table: table.to_string(), index });
        }
        rows.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_rows_shift_after_delete() {
        let store = MemoryStore::new();
        store.create_table("T", &row(&["H"])).await.unwrap();
        for cell in ["a", "b", "c"] {
            store.append_row("T", row(&[cell])).await.unwrap();
        }

        store.delete_row("T", 2).await.unwrap();
        let rows = store.read_rows("T").await.unwrap();
        assert_eq!(rows, vec![row(&["H"]), row(&["a"]), row(&["c"])]);
    }

    #[tokio::test]
    async fn test_missing_table_and_range_errors() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.append_row("nope", row(&["x"])).await,
            Err(StoreError::MissingTable(_))
        ));

        store.create_table("T", &row(&["H"])).await.unwrap();
        assert!(matches!(
            store.create_table("T", &row(&["H"])).await,
            Err(StoreError::TableExists(_))
        ));
        assert!(matches!(
            store.write_row("T", 5, row(&["x"])).await,
            Err(StoreError::RowOutOfRange { index: 5, .. })
        ));
        assert!(store.delete_row("T", 1).await.is_err());
    }
}

use std::sync::RwLock;

use tracing::debug;

use super::query::Query;
use super::{Record, StoreError, Table};

/// Vec-backed table. Writes are last-write-wins; there is no versioning.
pub struct MemoryTable<R> {
    rows: RwLock<Vec<R>>,
}

impl<R> Default for MemoryTable<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl<R: Record> MemoryTable<R> {
    pub fn with_rows(rows: Vec<R>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_columns(query: &Query, sample: Option<&R>) -> Result<(), StoreError> {
        let Some(sample) = sample else {
            return Ok(());
        };
        for column in query.columns() {
            if sample.column(column).is_none() {
                return Err(StoreError::UnknownColumn {
                    table: R::TABLE,
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("table lock poisoned".to_string())
}

impl<R: Record> Table<R> for MemoryTable<R> {
    fn select(&self, query: &Query) -> Result<Vec<R>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Self::check_columns(query, rows.first())?;

        let mut matched: Vec<R> = rows
            .iter()
            .filter(|row| {
                let lookup = |column: &str| row.column(column);
                query.filters.iter().all(|filter| filter.matches(&lookup))
            })
            .cloned()
            .collect();

        if !query.order.is_empty() {
            matched.sort_by(|a, b| {
                let left = |column: &str| a.column(column);
                let right = |column: &str| b.column(column);
                query.compare(&left, &right)
            });
        }

        debug!(table = R::TABLE, rows = matched.len(), "select");
        Ok(matched)
    }

    fn insert(&self, record: R) -> Result<R, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.iter().any(|row| row.id() == record.id()) {
            return Err(StoreError::Conflict(record.id().to_string()));
        }
        rows.push(record.clone());
        debug!(table = R::TABLE, id = record.id(), "insert");
        Ok(record)
    }

    fn update(&self, id: &str, patch: &mut dyn FnMut(&mut R)) -> Result<R, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let row = rows
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch(row);
        debug!(table = R::TABLE, id, "update");
        Ok(row.clone())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let before = rows.len();
        rows.retain(|row| row.id() != id);
        if rows.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!(table = R::TABLE, id, "delete");
        Ok(())
    }
}

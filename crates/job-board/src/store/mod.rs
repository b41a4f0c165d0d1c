//! Storage boundary for the board.
//!
//! Services only ever talk to [`Table`] trait objects bundled in a [`Store`]. The in-memory
//! backend in [`memory`] evaluates the same filter/order primitives a hosted relational store
//! would, so any backend offering equality, `ilike`, `in`, ordering and row counts can be
//! substituted without touching the services.

pub mod memory;
pub mod query;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::board::domain::{Application, Company, Interview, Job, UserProfile};
pub use memory::MemoryTable;
pub use query::{contains_pattern, Direction, Filter, Order, Query, Value};

/// A row type that can live in a [`Table`].
pub trait Record: Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> &str;

    /// Column lookup used by filters and ordering. `None` means the column does not exist.
    fn column(&self, name: &str) -> Option<Value>;
}

/// Single-table access. Every call is one independent round trip; nothing spans tables.
pub trait Table<R: Record>: Send + Sync {
    fn select(&self, query: &Query) -> Result<Vec<R>, StoreError>;

    /// Exactly one matching row, or `NoRows` / `MultipleRows`.
    fn single(&self, query: &Query) -> Result<R, StoreError> {
        let mut rows = self.select(query)?;
        match rows.len() {
            0 => Err(StoreError::NoRows),
            1 => Ok(rows.remove(0)),
            count => Err(StoreError::MultipleRows(count)),
        }
    }

    fn count(&self, query: &Query) -> Result<u64, StoreError> {
        Ok(self.select(query)?.len() as u64)
    }

    fn insert(&self, record: R) -> Result<R, StoreError>;

    /// Applies `patch` to the row with `id` and returns the stored result.
    fn update(&self, id: &str, patch: &mut dyn FnMut(&mut R)) -> Result<R, StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Failures surfaced by a store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("single-row query matched no rows")]
    NoRows,
    #[error("single-row query matched {0} rows")]
    MultipleRows(usize),
    #[error("row {0} not found")]
    NotFound(String),
    #[error("row {0} already exists")]
    Conflict(String),
    #[error("column `{column}` does not exist on `{table}`")]
    UnknownColumn { table: &'static str, column: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable machine-readable code, mirroring what a hosted store reports.
    pub const fn code(&self) -> &'static str {
        match self {
            StoreError::NoRows => "no_rows",
            StoreError::MultipleRows(_) => "multiple_rows",
            StoreError::NotFound(_) => "not_found",
            StoreError::Conflict(_) => "conflict",
            StoreError::UnknownColumn { .. } => "unknown_column",
            StoreError::Unavailable(_) => "unavailable",
        }
    }
}

/// Source of modification timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Handle to every table the board uses plus the clock. Cloning is cheap.
#[derive(Clone)]
pub struct Store {
    pub profiles: Arc<dyn Table<UserProfile>>,
    pub companies: Arc<dyn Table<Company>>,
    pub jobs: Arc<dyn Table<Job>>,
    pub applications: Arc<dyn Table<Application>>,
    pub interviews: Arc<dyn Table<Interview>>,
    pub clock: Arc<dyn Clock>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            profiles: Arc::new(MemoryTable::<UserProfile>::default()),
            companies: Arc::new(MemoryTable::<Company>::default()),
            jobs: Arc::new(MemoryTable::<Job>::default()),
            applications: Arc::new(MemoryTable::<Application>::default()),
            interviews: Arc::new(MemoryTable::<Interview>::default()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

//! Job board backend: companies, job postings, applications and interviews over a
//! pluggable store, with explicit session handling and an axum HTTP surface.

pub mod board;
pub mod config;
pub mod error;
pub mod store;
pub mod telemetry;

pub use board::{JobBoard, ServiceError};
pub use store::{Store, StoreError};

pub mod activity;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod records;
pub mod storage;
pub mod store;
pub mod summary;

pub use activity::ActivityLog;
pub use config::StoreConfig;
pub use error::{FarmError, FieldError, PersistenceError, Result};
pub use records::{project, RecordFilter, RecordView};
pub use storage::{FileStorage, KeyValueStore, MemoryContext, PersistenceAdapter, SharedStorage};
pub use store::{Committed, EntityStore};
pub use summary::DashboardSummary;

//! SQLite provider: executor, schema, repositories.

pub mod content_repository;
pub mod credit_repository;
pub mod ddl;
pub mod executor;
pub mod job_repository;
pub mod row_helpers;

pub use content_repository::SqliteContentRepository;
pub use credit_repository::SqliteCreditRepository;
pub use executor::SqliteExecutor;
pub use job_repository::SqliteJobRepository;

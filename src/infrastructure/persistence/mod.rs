mod memory_job_repository;
mod pg_job_repository;
mod pg_pool;

pub use memory_job_repository::InMemoryJobRepository;
pub use pg_job_repository::PgJobRepository;
pub use pg_pool::{create_pool, run_migrations};

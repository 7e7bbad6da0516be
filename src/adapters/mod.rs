mod postgres_batch_repository;

pub use postgres_batch_repository::PostgresBatchRepository;

// Application layer - Use cases and the traits they depend on
pub mod measurement_job;
pub mod measurement_source;
pub mod query_service;
pub mod sample_repository;
pub mod scheduler;
pub mod settings_repository;
pub mod settings_service;

#[cfg(test)]
pub mod testing;

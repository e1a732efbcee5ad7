// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod database;
pub mod http_response;
pub mod sample_store;
pub mod settings_store;
pub mod speed_probe;

// Domain layer - Core types with no I/O
pub mod error;
pub mod sample;
pub mod settings;

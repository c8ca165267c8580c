pub mod config;
pub mod error;
pub mod progress;
pub mod submission;
pub mod templates;
pub mod toolchain;
pub mod workspace;

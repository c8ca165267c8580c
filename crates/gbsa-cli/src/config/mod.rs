mod builder;
mod models;

pub use builder::build_config;
pub use models::AppConfig;

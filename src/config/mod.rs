pub mod env;
mod loader;

pub use env::{AppConfig, BlockingConfig, DirectoryConfig, PipelineConfig, WebContentConfig};
pub use loader::load_config;

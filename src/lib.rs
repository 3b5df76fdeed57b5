pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::command::CommandGateway;
pub use adapters::http::{create_router, AppState};
pub use core::{dispatch::DispatchEngine, pool::WorkerPool};
pub use utils::error::{DispatchError, Result};

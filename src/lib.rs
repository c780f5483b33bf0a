pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, SharedArgs};

pub use adapters::{BrowserFetcher, HttpFetcher, LocalStorage};
pub use config::HarvestConfig;
pub use crate::core::{harvest::HarvestEngine, state_harvest::StateHarvester};
pub use utils::error::{HarvestError, Result};

pub mod config;
pub mod core;
pub mod domain;
pub mod emit;
pub mod extract;
pub mod lipids;
pub mod orso;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, LocalStorage};

pub use config::ConversionSettings;
pub use core::{etl::ConversionEngine, pipeline::OrtPipeline};
pub use utils::error::{ConversionError, Result};

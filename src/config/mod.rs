#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, LocalStorage, LogFormat};
pub use settings::ConversionSettings;

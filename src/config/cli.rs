use crate::config::settings::ConversionSettings;
use crate::core::{ConfigProvider, Storage};
use crate::utils::error::Result;
use crate::utils::naming::sanitize_file_stem;
use crate::utils::validation::{
    validate_file_extension, validate_non_empty_string, validate_path, Validate,
};
use clap::{Parser, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

const FALLBACK_BASE_NAME: &str = "model";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "ort-to-rat")]
#[command(about = "Convert an ORSO .ort file into a RAT (Rascal) MATLAB model + project")]
pub struct CliConfig {
    /// Path to the ORSO .ort file
    pub ort_file: PathBuf,

    #[arg(long = "out", default_value = "./rat_models", help = "Output directory for MATLAB files")]
    pub output_path: String,

    #[arg(long, help = "Base name for output files (default: ORSO file stem)")]
    pub name: Option<String>,

    #[arg(long, help = "TOML settings file (bounds, bulks, lipids)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Lipid table: bundled, none, or a path to a TOML table")]
    pub lipid_table: Option<String>,

    #[arg(long, help = "Lipid used for unknown identifiers")]
    pub reference_lipid: Option<String>,

    #[arg(long, help = "Extract and generate, but write nothing")]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    #[arg(skip)]
    pub settings: ConversionSettings,
}

impl CliConfig {
    /// Reads `--config` if given, then applies the command-line overrides.
    pub fn load_settings(&mut self) -> Result<()> {
        if let Some(path) = &self.config {
            tracing::debug!("Loading settings from {}", path.display());
            self.settings = ConversionSettings::from_file(path)?;
        }
        if let Some(table) = &self.lipid_table {
            self.settings.lipids.table = table.clone();
        }
        if let Some(lipid) = &self.reference_lipid {
            self.settings.lipids.reference_lipid = lipid.clone();
        }
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn ort_file(&self) -> &Path {
        &self.ort_file
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn base_name(&self) -> String {
        let raw = match &self.name {
            Some(name) => name.clone(),
            None => self
                .ort_file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let base = sanitize_file_stem(&raw);
        if base.is_empty() {
            FALLBACK_BASE_NAME.to_string()
        } else {
            base
        }
    }

    fn settings(&self) -> &ConversionSettings {
        &self.settings
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("ort_file", &self.ort_file.to_string_lossy())?;
        validate_path("out", &self.output_path)?;
        if let Some(name) = &self.name {
            validate_non_empty_string("name", name)?;
        }
        if let Some(config) = &self.config {
            validate_file_extension("config", &config.to_string_lossy(), &["toml"])?;
        }
        self.settings.validate()
    }
}

/// Filesystem storage rooted at the output directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lipids::table::LipidTableSource;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::try_parse_from(std::iter::once("ort-to-rat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["data/my sample.ort"]);
        assert_eq!(config.output_path, "./rat_models");
        assert_eq!(config.base_name(), "my_sample");
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(!config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_name_is_sanitized() {
        let config = parse(&["x.ort", "--name", "__Lipid (v2)__"]);
        assert_eq!(config.base_name(), "Lipid_v2");

        let config = parse(&["x.ort", "--name", "???"]);
        assert_eq!(config.base_name(), "model");
    }

    #[test]
    fn test_overrides_apply_after_settings_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[lipids]\ntable = \"none\"\nreference_lipid = \"DOPC\"").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let mut config = parse(&["x.ort", "--config", &path, "--lipid-table", "bundled"]);
        config.load_settings().unwrap();
        assert_eq!(config.settings.lipids.source(), LipidTableSource::Bundled);
        assert_eq!(config.settings.lipids.reference_lipid, "DOPC");
    }

    #[test]
    fn test_config_must_be_toml() {
        let config = parse(&["x.ort", "--config", "settings.yaml"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_format_flag() {
        let config = parse(&["x.ort", "--log-format", "json", "-v"]);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.verbose);
    }

    #[tokio::test]
    async fn test_local_storage_creates_directories() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().to_string_lossy().into_owned());
        storage.write_file("data/copy.ort", b"# header\n").await.unwrap();
        assert_eq!(storage.read_file("data/copy.ort").await.unwrap(), b"# header\n");
        assert!(dir.path().join("data").is_dir());
    }

    #[test]
    fn test_missing_settings_file_is_io_error() {
        let missing = NamedTempFile::new().unwrap().path().with_extension("toml");
        let mut config = parse(&["x.ort", "--config", &missing.to_string_lossy()]);
        assert!(config.load_settings().is_err());
    }
}

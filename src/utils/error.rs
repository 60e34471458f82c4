use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML header error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Malformed ORSO file (dataset {dataset}): {message}")]
    OrsoFormat { dataset: usize, message: String },

    #[error("Malformed layer '{layer}' in contrast '{contrast}': {reason}")]
    MalformedLayer {
        contrast: String,
        layer: String,
        reason: String,
    },

    #[error("No valid models found in {source_name}: every contrast was skipped")]
    NoUsableContrasts { source_name: String },

    #[error(
        "Detected bilayer({lipids}) in the model stack, but no lipid property table is available"
    )]
    LipidSourceUnavailable { lipids: String },

    #[error("Lipid table '{source_name}' is invalid: {message}")]
    LipidTable {
        source_name: String,
        message: String,
    },

    #[error("Parameter vector error: {message}")]
    ParameterError { message: String },

    #[error("Failed to render generated text: {0}")]
    RenderError(#[from] std::fmt::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConversionError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ConversionError::IoError(_) => ErrorSeverity::Critical,
            ConversionError::ConfigError { .. }
            | ConversionError::InvalidConfigValueError { .. }
            | ConversionError::TomlError(_) => ErrorSeverity::Medium,
            ConversionError::SerializationError(_)
            | ConversionError::ParameterError { .. }
            | ConversionError::RenderError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ConversionError::IoError(_) => {
                "Check that the input file exists and the output directory is writable"
            }
            ConversionError::YamlError(_) | ConversionError::OrsoFormat { .. } => {
                "Check the '# ' header block of the .ort file is valid YAML"
            }
            ConversionError::TomlError(_)
            | ConversionError::ConfigError { .. }
            | ConversionError::InvalidConfigValueError { .. } => {
                "Fix the settings file or command-line value and run again"
            }
            ConversionError::MalformedLayer { .. } => {
                "Use a supported length unit (angstrom, nm, um) and finite numbers for every layer"
            }
            ConversionError::NoUsableContrasts { .. } => {
                "Make sure at least one dataset has data_source.sample.model with two or more layers"
            }
            ConversionError::LipidSourceUnavailable { .. } => {
                "Pass --lipid-table bundled or a lipid table file, or remove the bilayer(...) token"
            }
            ConversionError::LipidTable { .. } => {
                "Check the lipid table entries (headgroup.components, tails, nsl, cell_volume)"
            }
            ConversionError::SerializationError(_)
            | ConversionError::ParameterError { .. }
            | ConversionError::RenderError(_) => {
                "This is an internal error; please report it with the input file"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ConversionError::NoUsableContrasts { source_name } => {
                format!("No usable contrast in {}", source_name)
            }
            ConversionError::LipidSourceUnavailable { lipids } => {
                format!("Bilayer requested ({}) but lipid data is unavailable", lipids)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversionError>;

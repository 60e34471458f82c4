use crate::lipids::table::LipidTableSource;
use crate::utils::error::{ConversionError, Result};
use crate::utils::validation::{
    validate_bounds, validate_non_empty_string, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Tunables of a conversion. Every section is optional in the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    pub bounds: BoundsSettings,
    pub bilayer: BilayerBounds,
    pub bulk: BulkSettings,
    pub scalefactor: ScalefactorSettings,
    pub background: BackgroundSettings,
    pub lipids: LipidSettings,
}

/// Fractional spans used to derive fit bounds from nominal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsSettings {
    pub substrate_roughness_span: f64,
    pub thickness_span: f64,
    pub sld_span: f64,
    pub roughness_span: f64,
    /// Half-width of the window used when a nominal value is zero.
    pub zero_window: f64,
}

impl Default for BoundsSettings {
    fn default() -> Self {
        Self {
            substrate_roughness_span: 0.3,
            thickness_span: 0.3,
            sld_span: 0.2,
            roughness_span: 0.5,
            zero_window: 1e-6,
        }
    }
}

/// `[min, nominal, max]` per bilayer parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilayerBounds {
    /// Å²
    pub apm: [f64; 3],
    pub head_hydration: [f64; 3],
    pub bilayer_hydration: [f64; 3],
    /// Å
    pub roughness: [f64; 3],
}

impl Default for BilayerBounds {
    fn default() -> Self {
        Self {
            apm: [40.0, 60.0, 80.0],
            head_hydration: [0.0, 0.2, 1.0],
            bilayer_hydration: [0.0, 0.1, 1.0],
            roughness: [1.0, 4.0, 10.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkSettings {
    pub sld_span: f64,
    /// SLDs equal after rounding to this many decimals count as one bulk.
    pub key_decimals: u32,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            sld_span: 0.02,
            key_decimals: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalefactorSettings {
    pub bounds: [f64; 3],
}

impl Default for ScalefactorSettings {
    fn default() -> Self {
        Self {
            bounds: [0.5, 1.0, 2.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundSettings {
    pub bounds: [f64; 3],
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            bounds: [1e-8, 1e-6, 1e-4],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LipidSettings {
    /// `bundled`, `none` or a path to a TOML lipid table.
    pub table: String,
    pub reference_lipid: String,
}

impl Default for LipidSettings {
    fn default() -> Self {
        Self {
            table: "bundled".to_string(),
            reference_lipid: crate::lipids::resolver::DEFAULT_REFERENCE_LIPID.to_string(),
        }
    }
}

impl LipidSettings {
    pub fn source(&self) -> LipidTableSource {
        match self.table.parse() {
            Ok(source) => source,
            Err(never) => match never {},
        }
    }
}

impl ConversionSettings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| ConversionError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }
}

impl Validate for ConversionSettings {
    fn validate(&self) -> Result<()> {
        let b = &self.bounds;
        validate_range("bounds.substrate_roughness_span", b.substrate_roughness_span, 0.0, 1.0)?;
        validate_range("bounds.thickness_span", b.thickness_span, 0.0, 1.0)?;
        validate_range("bounds.sld_span", b.sld_span, 0.0, 1.0)?;
        validate_range("bounds.roughness_span", b.roughness_span, 0.0, 1.0)?;
        if !(b.zero_window.is_finite() && b.zero_window > 0.0) {
            return Err(ConversionError::InvalidConfigValueError {
                field: "bounds.zero_window".to_string(),
                value: b.zero_window.to_string(),
                reason: "Must be a positive number".to_string(),
            });
        }

        validate_bounds("bilayer.apm", self.bilayer.apm)?;
        if self.bilayer.apm[0] <= 0.0 {
            return Err(ConversionError::InvalidConfigValueError {
                field: "bilayer.apm".to_string(),
                value: format!("{:?}", self.bilayer.apm),
                reason: "Area per molecule must stay positive".to_string(),
            });
        }
        validate_bounds("bilayer.head_hydration", self.bilayer.head_hydration)?;
        validate_range("bilayer.head_hydration", self.bilayer.head_hydration[0], 0.0, 1.0)?;
        validate_range("bilayer.head_hydration", self.bilayer.head_hydration[2], 0.0, 1.0)?;
        validate_bounds("bilayer.bilayer_hydration", self.bilayer.bilayer_hydration)?;
        validate_range("bilayer.bilayer_hydration", self.bilayer.bilayer_hydration[0], 0.0, 1.0)?;
        validate_range("bilayer.bilayer_hydration", self.bilayer.bilayer_hydration[2], 0.0, 1.0)?;
        validate_bounds("bilayer.roughness", self.bilayer.roughness)?;

        validate_range("bulk.sld_span", self.bulk.sld_span, 0.0, 1.0)?;
        validate_range("bulk.key_decimals", self.bulk.key_decimals, 0, 15)?;
        validate_bounds("scalefactor.bounds", self.scalefactor.bounds)?;
        validate_bounds("background.bounds", self.background.bounds)?;

        validate_non_empty_string("lipids.table", &self.lipids.table)?;
        validate_non_empty_string("lipids.reference_lipid", &self.lipids.reference_lipid)?;
        Ok(())
    }
}

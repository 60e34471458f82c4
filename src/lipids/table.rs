//! Lipid property table: head/tail geometry and neutron scattering lengths
//! keyed by lipid identifier.

use crate::domain::ports::LipidPropertySource;
use crate::utils::error::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const BUNDLED_TABLE: &str = include_str!("../../data/lipids.toml");
const BUNDLED_NAME: &str = "bundled";

/// Scattering length (fm), either a total or per-atom-group contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nsl {
    Scalar(f64),
    Sequence(Vec<f64>),
}

impl Nsl {
    pub fn total(&self) -> f64 {
        match self {
            Nsl::Scalar(value) => *value,
            Nsl::Sequence(values) => values.iter().sum(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cell_volume: Option<f64>,
    #[serde(default)]
    pub nsl: Option<Nsl>,
}

impl Component {
    pub fn volume(&self) -> f64 {
        self.cell_volume.unwrap_or(0.0)
    }

    pub fn scattering_length(&self) -> f64 {
        self.nsl.as_ref().map(Nsl::total).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headgroup {
    #[serde(default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LipidEntry {
    #[serde(default)]
    pub headgroup: Option<Headgroup>,
    #[serde(default)]
    pub headgroup_volume: Option<f64>,
    #[serde(default)]
    pub tails: Option<Component>,
}

/// Where lipid properties come from for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LipidTableSource {
    Bundled,
    None,
    File(PathBuf),
}

impl std::str::FromStr for LipidTableSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "bundled" => LipidTableSource::Bundled,
            "none" => LipidTableSource::None,
            path => LipidTableSource::File(PathBuf::from(path)),
        })
    }
}

impl std::fmt::Display for LipidTableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LipidTableSource::Bundled => write!(f, "bundled"),
            LipidTableSource::None => write!(f, "none"),
            LipidTableSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LipidTable {
    name: String,
    entries: BTreeMap<String, LipidEntry>,
}

impl LipidTable {
    pub fn bundled() -> Result<Self> {
        Self::from_toml_str(BUNDLED_NAME, BUNDLED_TABLE)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&path.display().to_string(), &content)
    }

    pub fn from_toml_str(name: &str, content: &str) -> Result<Self> {
        let entries: BTreeMap<String, LipidEntry> =
            toml::from_str(content).map_err(|e| ConversionError::LipidTable {
                source_name: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            name: name.to_string(),
            entries,
        })
    }

    /// `Ok(None)` when the source is explicitly absent.
    pub fn load(source: &LipidTableSource) -> Result<Option<Self>> {
        match source {
            LipidTableSource::Bundled => Self::bundled().map(Some),
            LipidTableSource::None => Ok(None),
            LipidTableSource::File(path) => Self::from_file(path).map(Some),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lipid_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl LipidPropertySource for LipidTable {
    fn lookup(&self, lipid_id: &str) -> Option<&LipidEntry> {
        self.entries.get(lipid_id)
    }
}

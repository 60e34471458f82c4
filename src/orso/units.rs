use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("unknown length unit '{0}'")]
    UnknownLengthUnit(String),

    #[error("unknown SLD unit '{0}'")]
    UnknownSldUnit(String),

    #[error("value {0} is not a finite number")]
    NonFinite(f64),
}

/// A number as written in an ORSO header: bare, or `{magnitude, unit}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Bare(f64),
    Value {
        magnitude: f64,
        #[serde(default)]
        unit: Option<String>,
    },
}

impl Quantity {
    /// Attaches `default_unit` when the header did not give one.
    pub fn to_length(&self, default_unit: &str) -> Length {
        match self {
            Quantity::Bare(magnitude) => Length::new(*magnitude, default_unit),
            Quantity::Value { magnitude, unit } => {
                Length::new(*magnitude, unit.as_deref().unwrap_or(default_unit))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub magnitude: f64,
    pub unit: String,
}

impl Length {
    pub fn new(magnitude: f64, unit: &str) -> Self {
        Self {
            magnitude,
            unit: unit.to_string(),
        }
    }

    pub fn as_angstrom(&self) -> Result<f64, UnitError> {
        if !self.magnitude.is_finite() {
            return Err(UnitError::NonFinite(self.magnitude));
        }
        let factor = match self.unit.trim().to_lowercase().as_str() {
            "angstrom" | "angstroms" | "aa" | "a" | "å" => 1.0,
            "nm" | "nanometer" | "nanometers" => 10.0,
            "um" | "µm" | "micrometer" | "micrometers" | "micron" => 1e4,
            "mm" | "millimeter" | "millimeters" => 1e7,
            _ => return Err(UnitError::UnknownLengthUnit(self.unit.clone())),
        };
        Ok(self.magnitude * factor)
    }
}

/// Real part of a scattering-length density and its unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sld {
    pub real: f64,
    pub unit: String,
}

pub const DEFAULT_SLD_UNIT: &str = "1/angstrom^2";

impl Sld {
    pub fn per_square_angstrom(real: f64) -> Self {
        Self {
            real,
            unit: DEFAULT_SLD_UNIT.to_string(),
        }
    }

    pub fn as_inverse_square_angstrom(&self) -> Result<f64, UnitError> {
        if !self.real.is_finite() {
            return Err(UnitError::NonFinite(self.real));
        }
        let unit: String = self
            .unit
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let factor = match unit.as_str() {
            "1/angstrom^2" | "1/aa^2" | "1/å^2" | "angstrom^-2" | "aa^-2" | "å^-2" => 1.0,
            "1/nm^2" | "nm^-2" => 1e-2,
            _ => return Err(UnitError::UnknownSldUnit(self.unit.clone())),
        };
        Ok(self.real * factor)
    }
}

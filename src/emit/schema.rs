//! The ordered parameter list shared by the model function and the driver
//! script. Both artifacts are rendered from one `ParameterSchema`, so the
//! k-th entry here is `params(k)` in the generated code.

use crate::config::settings::{BilayerBounds, BoundsSettings};
use crate::domain::model::{BilayerSpec, LayerRecord};
use crate::utils::naming::{make_unique, normalize_identifier};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SUBSTRATE_ROUGHNESS: &str = "Substrate Roughness";
pub const PARAMS_PER_LAYER: usize = 3;
pub const PARAMS_PER_BILAYER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub value: f64,
    pub max: f64,
}

impl Bounds {
    pub fn from_array([min, value, max]: [f64; 3]) -> Self {
        Self { min, value, max }
    }

    /// `value·(1±frac)` ordered low to high, or `±zero_window` around zero
    /// when `value` is (numerically) zero.
    pub fn span(value: f64, frac: f64, zero_window: f64) -> Self {
        if value.abs() < 1e-12 {
            return Self {
                min: -zero_window,
                value: 0.0,
                max: zero_window,
            };
        }
        let lo = value * (1.0 - frac);
        let hi = value * (1.0 + frac);
        Self {
            min: lo.min(hi),
            value,
            max: lo.max(hi),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerField {
    Thickness,
    Sld,
    Roughness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BilayerField {
    Apm,
    HeadHydrationInner,
    HeadHydrationOuter,
    BilayerHydration,
    Roughness,
}

/// What a parameter means. Layer and bilayer positions are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamRole {
    SubstrateRoughness,
    Layer { layer: usize, field: LayerField },
    Bilayer { bilayer: usize, field: BilayerField },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    /// 1-based, as used in MATLAB.
    pub index: usize,
    pub name: String,
    pub role: ParamRole,
    pub bounds: Bounds,
    pub fit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    params: Vec<ParameterDef>,
    layer_names: Vec<String>,
    bilayer_labels: Vec<String>,
}

impl ParameterSchema {
    pub fn build(
        substrate_roughness: f64,
        internal_layers: &[LayerRecord],
        bilayers: &[BilayerSpec],
        bounds: &BoundsSettings,
        bilayer_bounds: &BilayerBounds,
    ) -> Self {
        let mut schema = Self {
            params: Vec::with_capacity(
                1 + PARAMS_PER_LAYER * internal_layers.len() + PARAMS_PER_BILAYER * bilayers.len(),
            ),
            layer_names: Vec::with_capacity(internal_layers.len()),
            bilayer_labels: Vec::with_capacity(bilayers.len()),
        };

        schema.push(
            SUBSTRATE_ROUGHNESS.to_string(),
            ParamRole::SubstrateRoughness,
            Bounds::span(
                substrate_roughness,
                bounds.substrate_roughness_span,
                bounds.zero_window,
            ),
        );

        let mut used = HashSet::new();
        for (i, layer) in internal_layers.iter().enumerate() {
            let mut base = normalize_identifier(&layer.name);
            if base.is_empty() {
                base = format!("Layer{}", i + 1);
            }
            let name = make_unique(&base, &mut used, " ");

            let fields = [
                (LayerField::Thickness, "thickness", layer.thickness, bounds.thickness_span),
                (LayerField::Sld, "SLD", layer.sld, bounds.sld_span),
                (LayerField::Roughness, "rough", layer.roughness, bounds.roughness_span),
            ];
            for (field, suffix, value, frac) in fields {
                schema.push(
                    format!("{} {}", name, suffix),
                    ParamRole::Layer { layer: i, field },
                    Bounds::span(value, frac, bounds.zero_window),
                );
            }
            schema.layer_names.push(name);
        }

        for (j, bilayer) in bilayers.iter().enumerate() {
            let n = j + 1;
            let fields = [
                (BilayerField::Apm, format!("Bilayer{} APM", n), bilayer_bounds.apm),
                (
                    BilayerField::HeadHydrationInner,
                    format!("Bilayer{} HeadHyd Inner", n),
                    bilayer_bounds.head_hydration,
                ),
                (
                    BilayerField::HeadHydrationOuter,
                    format!("Bilayer{} HeadHyd Outer", n),
                    bilayer_bounds.head_hydration,
                ),
                (
                    BilayerField::BilayerHydration,
                    format!("Bilayer{} BilayerHydration", n),
                    bilayer_bounds.bilayer_hydration,
                ),
                (BilayerField::Roughness, format!("Bilayer{} Rough", n), bilayer_bounds.roughness),
            ];
            for (field, name, limits) in fields {
                schema.push(
                    name,
                    ParamRole::Bilayer { bilayer: j, field },
                    Bounds::from_array(limits),
                );
            }
            schema.bilayer_labels.push(format!(
                "inner={}, outer={}",
                normalize_identifier(&bilayer.inner),
                normalize_identifier(&bilayer.outer)
            ));
        }

        schema
    }

    fn push(&mut self, name: String, role: ParamRole, bounds: Bounds) {
        self.params.push(ParameterDef {
            index: self.params.len() + 1,
            name,
            role,
            bounds,
            fit: true,
        });
    }

    pub fn params(&self) -> &[ParameterDef] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn layer_count(&self) -> usize {
        self.layer_names.len()
    }

    pub fn bilayer_count(&self) -> usize {
        self.bilayer_labels.len()
    }

    /// Unique, ASCII-folded internal layer names.
    pub fn layer_names(&self) -> &[String] {
        &self.layer_names
    }

    /// `inner=…, outer=…` per bilayer, for comments.
    pub fn bilayer_labels(&self) -> &[String] {
        &self.bilayer_labels
    }

    pub fn substrate_roughness(&self) -> &ParameterDef {
        &self.params[0]
    }

    /// 1-based index of a field of internal layer `layer` (0-based).
    pub fn layer_index(&self, layer: usize, field: LayerField) -> usize {
        let offset = match field {
            LayerField::Thickness => 0,
            LayerField::Sld => 1,
            LayerField::Roughness => 2,
        };
        2 + PARAMS_PER_LAYER * layer + offset
    }

    /// 1-based index of a field of bilayer `bilayer` (0-based).
    pub fn bilayer_index(&self, bilayer: usize, field: BilayerField) -> usize {
        let offset = match field {
            BilayerField::Apm => 0,
            BilayerField::HeadHydrationInner => 1,
            BilayerField::HeadHydrationOuter => 2,
            BilayerField::BilayerHydration => 3,
            BilayerField::Roughness => 4,
        };
        2 + PARAMS_PER_LAYER * self.layer_count() + PARAMS_PER_BILAYER * bilayer + offset
    }

    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn nominal_values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.bounds.value).collect()
    }
}

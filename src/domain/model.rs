use serde::{Deserialize, Serialize};

/// Roughness used when a layer does not declare one (Å).
pub const DEFAULT_ROUGHNESS: f64 = 3.0;

/// One physical layer, normalized to Å and Å⁻².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub name: String,
    pub thickness: f64,
    pub sld: f64,
    pub roughness: f64,
}

/// Semi-infinite medium bounding a contrast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRecord {
    pub name: String,
    pub sld: f64,
}

impl BulkRecord {
    /// Identity used to de-duplicate bulk declarations: the name plus the
    /// SLD rounded to `decimals` places.
    pub fn dedup_key(&self, decimals: u32) -> (String, i64) {
        let scale = 10f64.powi(decimals as i32);
        (self.name.clone(), (self.sld * scale).round() as i64)
    }
}

/// Layers of one usable contrast, bulks included at both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastStack {
    pub layers: Vec<LayerRecord>,
    pub bulk_in: BulkRecord,
    pub bulk_out: BulkRecord,
}

impl ContrastStack {
    /// Layers between bulk-in and bulk-out.
    pub fn internal_layers(&self) -> &[LayerRecord] {
        match self.layers.len() {
            0..=2 => &[],
            n => &self.layers[1..n - 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastRecord {
    /// 1-based position of the dataset in the source file.
    pub index: usize,
    pub display_name: String,
    /// `None` when the contrast was skipped during extraction.
    pub stack: Option<ContrastStack>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BilayerToken {
    pub inner: String,
    pub outer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LipidConstants {
    /// Å³
    pub head_vol: f64,
    /// Å⁻²
    pub head_sld: f64,
    pub tail_vol: f64,
    pub tail_sld: f64,
}

/// Bilayer token merged with the resolved constants of both leaflets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilayerSpec {
    pub inner: String,
    pub outer: String,
    pub v_head_inner: f64,
    pub v_tail_inner: f64,
    pub v_head_outer: f64,
    pub v_tail_outer: f64,
    pub sld_head_inner: f64,
    pub sld_tail_inner: f64,
    pub sld_head_outer: f64,
    pub sld_tail_outer: f64,
}

impl BilayerSpec {
    pub fn from_constants(token: &BilayerToken, inner: LipidConstants, outer: LipidConstants) -> Self {
        Self {
            inner: token.inner.clone(),
            outer: token.outer.clone(),
            v_head_inner: inner.head_vol,
            v_tail_inner: inner.tail_vol,
            v_head_outer: outer.head_vol,
            v_tail_outer: outer.tail_vol,
            sld_head_inner: inner.head_sld,
            sld_tail_inner: inner.tail_sld,
            sld_head_outer: outer.head_sld,
            sld_tail_outer: outer.tail_sld,
        }
    }
}

/// Output of the extract stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedSample {
    pub source_name: String,
    pub contrasts: Vec<ContrastRecord>,
    pub bilayer_tokens: Vec<BilayerToken>,
    pub bilayers: Vec<BilayerSpec>,
}

impl ExtractedSample {
    /// Contrasts that produced layer data, in file order.
    pub fn usable(&self) -> impl Iterator<Item = (&ContrastRecord, &ContrastStack)> {
        self.contrasts
            .iter()
            .filter_map(|c| c.stack.as_ref().map(|stack| (c, stack)))
    }

    /// The stack whose internal layers parametrize the shared model.
    pub fn reference_stack(&self) -> Option<&ContrastStack> {
        self.usable().next().map(|(_, stack)| stack)
    }

    pub fn per_contrast_layers(&self) -> Vec<&[LayerRecord]> {
        self.usable().map(|(_, s)| s.layers.as_slice()).collect()
    }

    pub fn bulk_ins(&self) -> Vec<&BulkRecord> {
        self.usable().map(|(_, s)| &s.bulk_in).collect()
    }

    pub fn bulk_outs(&self) -> Vec<&BulkRecord> {
        self.usable().map(|(_, s)| &s.bulk_out).collect()
    }

    pub fn contrast_names(&self) -> Vec<&str> {
        self.contrasts.iter().map(|c| c.display_name.as_str()).collect()
    }
}

/// Summary of one conversion, written next to the generated files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub source: String,
    pub base_name: String,
    pub model_file: String,
    pub driver_file: String,
    pub parameters: Vec<String>,
    pub contrasts: Vec<ContrastSummary>,
    pub bilayers: Vec<BilayerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContrastSummary {
    pub index: usize,
    pub name: String,
    pub wired: bool,
    pub bulk_in: Option<String>,
    pub bulk_out: Option<String>,
    /// `[thickness, sld, roughness]` rows of the model at nominal values.
    pub nominal_stack: Vec<[f64; 3]>,
}

/// Output of the transform stage.
#[derive(Debug, Clone)]
pub struct GeneratedArtifacts {
    pub model_file: String,
    pub model_source: String,
    pub driver_file: String,
    pub driver_source: String,
    pub summary: ConversionSummary,
}

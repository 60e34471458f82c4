use crate::domain::model::{
    BilayerToken, BulkRecord, ContrastRecord, ContrastStack, ExtractedSample, LayerRecord,
    DEFAULT_ROUGHNESS,
};
use crate::extract::stack_tokens::extract_bilayers;
use crate::lipids::bilayer::build_bilayer_specs;
use crate::lipids::resolver::LipidConstantResolver;
use crate::orso::model_language::ResolvedLayer;
use crate::orso::OrsoFile;
use crate::utils::error::{ConversionError, Result};
use crate::utils::naming::{contrast_display_name, normalize_identifier};

/// Media recognized as bulk names, checked in this order.
pub const KNOWN_BULKS: [&str; 7] = ["D2O", "H2O", "AuMW", "SiMW", "SMW", "Si", "Air"];

const DEFAULT_LAYER_NAME: &str = "Layer";
const BULK_IN_FALLBACK: &str = "Substrate";
const BULK_OUT_FALLBACK: &str = "Air";

fn match_known_bulk(candidate: Option<&str>) -> Option<&'static str> {
    let candidate = candidate.map(str::trim).filter(|c| !c.is_empty())?;
    let lowered = candidate.to_lowercase();
    KNOWN_BULKS
        .iter()
        .find(|known| lowered.contains(&known.to_lowercase()))
        .copied()
}

/// Guesses a display name for a bulk medium from its material name, then the
/// stack item as written, then the formula. `fallback` if nothing matches.
pub fn infer_bulk_name(layer: &ResolvedLayer, fallback: &str) -> String {
    if let Some(known) = match_known_bulk(layer.material.name.as_deref()) {
        return known.to_string();
    }
    if let Some(known) = match_known_bulk(layer.original_name.as_deref()) {
        return known.to_string();
    }
    if let Some(formula) = layer.material.formula.as_deref() {
        let formula = formula.to_lowercase();
        if formula.contains("d2o") {
            return "D2O".to_string();
        }
        if formula.contains("h2o") {
            return "H2O".to_string();
        }
    }
    fallback.to_string()
}

/// Converts a resolved layer to Å / Å⁻². Unknown units and non-finite
/// numbers are errors; a material without a known SLD gets 0.
pub fn normalize_layer(contrast: &str, layer: &ResolvedLayer) -> Result<LayerRecord> {
    let raw_name = layer
        .original_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| layer.material.name.as_deref().filter(|n| !n.trim().is_empty()))
        .unwrap_or(DEFAULT_LAYER_NAME);
    let mut name = normalize_identifier(raw_name);
    if name.is_empty() {
        name = DEFAULT_LAYER_NAME.to_string();
    }

    let malformed = |reason: String| ConversionError::MalformedLayer {
        contrast: contrast.to_string(),
        layer: name.clone(),
        reason,
    };

    let thickness = match &layer.thickness {
        Some(length) => length.as_angstrom().map_err(|e| malformed(e.to_string()))?,
        None => 0.0,
    };

    let sld = match &layer.material.sld {
        Some(sld) => sld
            .as_inverse_square_angstrom()
            .map_err(|e| malformed(e.to_string()))?,
        None => {
            tracing::debug!("{}: no SLD known for '{}', using 0", contrast, name);
            0.0
        }
    };

    let roughness = match &layer.roughness {
        Some(length) => length.as_angstrom().map_err(|e| malformed(e.to_string()))?,
        None => DEFAULT_ROUGHNESS,
    };

    Ok(LayerRecord {
        name,
        thickness,
        sld,
        roughness,
    })
}

/// Walks every dataset of an ORSO file and builds the extracted sample.
///
/// Contrasts that cannot be used are recorded without a stack and logged;
/// the run only fails when none is left, or when a bilayer was requested
/// and the lipid source is unavailable.
pub struct ModelExtractor<'r, 'a> {
    resolver: &'r LipidConstantResolver<'a>,
}

impl<'r, 'a> ModelExtractor<'r, 'a> {
    pub fn new(resolver: &'r LipidConstantResolver<'a>) -> Self {
        Self { resolver }
    }

    pub fn extract(&self, file: OrsoFile) -> Result<ExtractedSample> {
        tracing::info!("✔ Loaded ORSO file with {} dataset(s)", file.len());

        let source_name = file.source_name;
        let mut contrasts = Vec::with_capacity(file.datasets.len());
        let mut bilayer_tokens: Option<Vec<BilayerToken>> = None;

        for mut dataset in file.datasets {
            let index = dataset.index;
            let sample_name = dataset
                .sample_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Contrast_{}", index));
            let display_name = contrast_display_name(&sample_name);

            let stack = match dataset.model_mut() {
                None => {
                    tracing::warn!("⚠ No model found in dataset {}, skipping", index);
                    None
                }
                Some(model) => {
                    let found = extract_bilayers(model);
                    if !found.is_empty() && bilayer_tokens.is_none() {
                        tracing::debug!(
                            "Dataset {} defines {} bilayer type(s) for the run",
                            index,
                            found.len()
                        );
                        bilayer_tokens = Some(found);
                    }
                    self.contrast_stack(&display_name, model.resolve_to_layers())
                }
            };

            if let Some(stack) = &stack {
                tracing::info!("   ↳ Contrast {}: {}", index, display_name);
                tracing::info!(
                    "      BulkIn : {} (SLD={:.3e})",
                    stack.bulk_in.name,
                    stack.bulk_in.sld
                );
                tracing::info!(
                    "      BulkOut: {} (SLD={:.3e})",
                    stack.bulk_out.name,
                    stack.bulk_out.sld
                );
            }

            contrasts.push(ContrastRecord {
                index,
                display_name,
                stack,
            });
        }

        let sample = ExtractedSample {
            source_name,
            contrasts,
            bilayer_tokens: bilayer_tokens.unwrap_or_default(),
            bilayers: Vec::new(),
        };

        let internal = match sample.reference_stack() {
            Some(stack) => stack.internal_layers().len(),
            None => {
                return Err(ConversionError::NoUsableContrasts {
                    source_name: sample.source_name,
                })
            }
        };
        tracing::info!("✔ Using {} internal layers from first dataset", internal);

        let bilayers = build_bilayer_specs(&sample.bilayer_tokens, self.resolver)?;
        Ok(ExtractedSample { bilayers, ..sample })
    }

    fn contrast_stack(
        &self,
        display_name: &str,
        resolved: std::result::Result<Vec<ResolvedLayer>, crate::orso::model_language::ModelError>,
    ) -> Option<ContrastStack> {
        let resolved = match resolved {
            Ok(layers) => layers,
            Err(e) => {
                tracing::warn!(
                    "⚠ Could not resolve layers for {}: {}",
                    display_name,
                    e
                );
                return None;
            }
        };

        if resolved.len() < 2 {
            tracing::warn!("⚠ Skipping {}: not enough layers", display_name);
            return None;
        }

        let layers = match resolved
            .iter()
            .map(|layer| normalize_layer(display_name, layer))
            .collect::<Result<Vec<_>>>()
        {
            Ok(layers) => layers,
            Err(e) => {
                tracing::error!("❌ Skipping contrast {}: {}", display_name, e);
                return None;
            }
        };

        let first = &resolved[0];
        let last = &resolved[resolved.len() - 1];
        let bulk_in = BulkRecord {
            name: infer_bulk_name(first, BULK_IN_FALLBACK),
            sld: layers[0].sld,
        };
        let bulk_out = BulkRecord {
            name: infer_bulk_name(last, BULK_OUT_FALLBACK),
            sld: layers[layers.len() - 1].sld,
        };

        Some(ContrastStack {
            layers,
            bulk_in,
            bulk_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lipids::table::LipidTable;
    use crate::orso::model_language::ResolvedMaterial;
    use crate::orso::units::{Length, Sld};

    fn resolved(original: Option<&str>, material: Option<&str>, formula: Option<&str>) -> ResolvedLayer {
        ResolvedLayer {
            original_name: original.map(str::to_string),
            thickness: None,
            roughness: None,
            material: ResolvedMaterial {
                name: material.map(str::to_string),
                formula: formula.map(str::to_string),
                sld: None,
            },
        }
    }

    fn ort(datasets: &[(&str, Option<&str>)]) -> String {
        let mut text = String::new();
        for (i, (name, stack)) in datasets.iter().enumerate() {
            if i > 0 {
                text.push_str(&format!("# data_set: {}\n", i));
            }
            text.push_str("# data_source:\n#   sample:\n");
            text.push_str(&format!("#     name: {}\n", name));
            if let Some(stack) = stack {
                text.push_str(&format!("#     model:\n#       stack: {}\n", stack));
            }
            text.push_str("0.01 1.0\n0.02 0.5\n");
        }
        text
    }

    #[test]
    fn test_bulk_name_priority() {
        let layer = resolved(Some("buffer"), Some("my d2o"), Some("H2O"));
        assert_eq!(infer_bulk_name(&layer, "Air"), "D2O");

        let layer = resolved(Some("SiMW_block"), Some("mystery"), None);
        assert_eq!(infer_bulk_name(&layer, "Substrate"), "SiMW");

        let layer = resolved(Some("x"), Some("y"), Some("0.9 H2O + 0.1 salt"));
        assert_eq!(infer_bulk_name(&layer, "Air"), "H2O");

        let layer = resolved(Some("quartz"), Some("Si wafer"), None);
        assert_eq!(infer_bulk_name(&layer, "Substrate"), "Si");

        // formulas are only checked for water
        let layer = resolved(Some("quartz"), None, Some("SiO2"));
        assert_eq!(infer_bulk_name(&layer, "Substrate"), "Substrate");

        let layer = resolved(Some("quartz"), None, Some("Al2O3"));
        assert_eq!(infer_bulk_name(&layer, "Substrate"), "Substrate");
    }

    #[test]
    fn test_bulk_name_ignores_blank_names() {
        let layer = resolved(Some("  "), Some(""), None);
        assert_eq!(infer_bulk_name(&layer, "Air"), "Air");
    }

    #[test]
    fn test_normalize_layer_defaults() {
        let layer = resolved(None, None, None);
        let record = normalize_layer("c1", &layer).unwrap();
        assert_eq!(record.name, "Layer");
        assert_eq!(record.thickness, 0.0);
        assert_eq!(record.sld, 0.0);
        assert_eq!(record.roughness, DEFAULT_ROUGHNESS);
    }

    #[test]
    fn test_normalize_layer_converts_units() {
        let mut layer = resolved(Some(" SiO\u{2082} "), Some("SiO2"), None);
        layer.thickness = Some(Length::new(1.5, "nm"));
        layer.roughness = Some(Length::new(4.0, "angstrom"));
        layer.material.sld = Some(Sld {
            real: 3.47,
            unit: "1/nm^2".to_string(),
        });
        let record = normalize_layer("c1", &layer).unwrap();
        assert_eq!(record.name, "SiO2");
        assert_eq!(record.thickness, 15.0);
        assert_eq!(record.roughness, 4.0);
        assert!((record.sld - 3.47e-2).abs() < 1e-15);
    }

    #[test]
    fn test_normalize_layer_rejects_unknown_unit() {
        let mut layer = resolved(Some("SiO2"), None, None);
        layer.thickness = Some(Length::new(1.0, "furlong"));
        match normalize_layer("run 1", &layer).unwrap_err() {
            ConversionError::MalformedLayer { contrast, layer, reason } => {
                assert_eq!(contrast, "run 1");
                assert_eq!(layer, "SiO2");
                assert!(reason.contains("furlong"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_two_contrasts() {
        let text = ort(&[
            ("lipid_D2O th=5nm", Some("Si | SiO2 1.2 | bilayer(inner=DPPC, outer=DPPC) | D2O")),
            ("lipid_H2O", Some("Si | SiO2 1.2 | bilayer(inner=DOPC, outer=DOPC) | H2O")),
        ]);
        let file = OrsoFile::parse("lipid.ort", &text).unwrap();
        let table = LipidTable::bundled().unwrap();
        let resolver = LipidConstantResolver::new(Some(&table));
        let sample = ModelExtractor::new(&resolver).extract(file).unwrap();

        assert_eq!(sample.contrast_names(), vec![r"lipid\_D2O", r"lipid\_H2O"]);
        assert_eq!(sample.per_contrast_layers().len(), 2);
        let stack = sample.reference_stack().unwrap();
        assert_eq!(stack.layers.len(), 3);
        assert_eq!(stack.internal_layers()[0].name, "SiO2");
        assert_eq!(stack.internal_layers()[0].thickness, 12.0);
        assert_eq!(stack.bulk_in.name, "Si");
        assert_eq!(stack.bulk_out.name, "D2O");
        assert_eq!(sample.bulk_outs()[1].name, "H2O");

        // only the first contrast with tokens defines the bilayer set
        assert_eq!(sample.bilayer_tokens.len(), 1);
        assert_eq!(sample.bilayer_tokens[0].inner, "DPPC");
        assert_eq!(sample.bilayers.len(), 1);
    }

    #[test]
    fn test_contrast_without_model_is_skipped() {
        let text = ort(&[("empty", None), ("real", Some("Si | D2O"))]);
        let file = OrsoFile::parse("mixed.ort", &text).unwrap();
        let resolver = LipidConstantResolver::new(None);
        let sample = ModelExtractor::new(&resolver).extract(file).unwrap();

        assert_eq!(sample.contrasts.len(), 2);
        assert!(sample.contrasts[0].stack.is_none());
        assert_eq!(sample.contrasts[1].index, 2);
        assert!(sample.reference_stack().unwrap().internal_layers().is_empty());
    }

    #[test]
    fn test_single_layer_contrast_is_skipped() {
        let text = ort(&[("one", Some("Si")), ("two", Some("Si | SiO2 1 | D2O"))]);
        let file = OrsoFile::parse("x.ort", &text).unwrap();
        let resolver = LipidConstantResolver::new(None);
        let sample = ModelExtractor::new(&resolver).extract(file).unwrap();
        assert!(sample.contrasts[0].stack.is_none());
        assert!(sample.contrasts[1].stack.is_some());
    }

    #[test]
    fn test_malformed_layer_only_drops_its_contrast() {
        let text = "\
# data_source:
#   sample:
#     name: bad
#     model:
#       stack: Si | film | D2O
#       layers:
#         film: {thickness: {magnitude: 3, unit: furlong}, material: SiO2}
0.01 1.0
# data_set: 1
# data_source:
#   sample:
#     name: good
#     model:
#       stack: Si | SiO2 2 | D2O
#       layers: {}
0.01 1.0
";
        let file = OrsoFile::parse("x.ort", text).unwrap();
        let resolver = LipidConstantResolver::new(None);
        let sample = ModelExtractor::new(&resolver).extract(file).unwrap();
        assert!(sample.contrasts[0].stack.is_none());
        assert_eq!(sample.reference_stack().unwrap().internal_layers()[0].thickness, 20.0);
    }

    #[test]
    fn test_no_usable_contrast_is_fatal() {
        let text = ort(&[("a", None), ("b", Some("Si"))]);
        let file = OrsoFile::parse("void.ort", &text).unwrap();
        let resolver = LipidConstantResolver::new(None);
        match ModelExtractor::new(&resolver).extract(file).unwrap_err() {
            ConversionError::NoUsableContrasts { source_name } => {
                assert_eq!(source_name, "void.ort")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bilayer_without_lipid_source_is_fatal() {
        let text = ort(&[("a", Some("Si | bilayer(inner=DPPC, outer=DPPC) | D2O"))]);
        let file = OrsoFile::parse("x.ort", &text).unwrap();
        let resolver = LipidConstantResolver::new(None);
        let err = ModelExtractor::new(&resolver).extract(file).unwrap_err();
        assert!(matches!(err, ConversionError::LipidSourceUnavailable { .. }));
    }
}

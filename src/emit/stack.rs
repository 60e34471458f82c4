//! Rust mirror of the generated model function. Used to report the nominal
//! layer stack per contrast and to check the expansion rules.

use crate::domain::model::BilayerSpec;
use crate::emit::schema::{BilayerField, LayerField, ParameterSchema};
use crate::utils::error::{ConversionError, Result};

/// Linear solvent mixing: `fraction` of bulk-out, the rest intrinsic.
pub fn hydrate_sld(fraction: f64, bulk_out: f64, intrinsic: f64) -> f64 {
    fraction * bulk_out + (1.0 - fraction) * intrinsic
}

/// Evaluates `[thickness, sld, roughness]` rows for one contrast.
///
/// `contrast` is 1-based and selects the entry of `bulk_out`, as MATLAB
/// indexing does in the generated function.
pub fn evaluate_stack(
    schema: &ParameterSchema,
    bilayers: &[BilayerSpec],
    params: &[f64],
    bulk_out: &[f64],
    contrast: usize,
) -> Result<Vec<[f64; 3]>> {
    if params.len() != schema.len() {
        return Err(ConversionError::ParameterError {
            message: format!("expected {} parameters, got {}", schema.len(), params.len()),
        });
    }
    if bilayers.len() != schema.bilayer_count() {
        return Err(ConversionError::ParameterError {
            message: format!(
                "schema describes {} bilayer(s) but {} were given",
                schema.bilayer_count(),
                bilayers.len()
            ),
        });
    }
    let solvent = contrast
        .checked_sub(1)
        .and_then(|i| bulk_out.get(i))
        .copied()
        .ok_or_else(|| ConversionError::ParameterError {
            message: format!(
                "contrast {} out of range for {} bulk-out value(s)",
                contrast,
                bulk_out.len()
            ),
        })?;

    let p = |index: usize| params[index - 1];
    let mut rows = Vec::with_capacity(schema.layer_count() + 4 * bilayers.len());

    for i in 0..schema.layer_count() {
        rows.push([
            p(schema.layer_index(i, LayerField::Thickness)),
            p(schema.layer_index(i, LayerField::Sld)),
            p(schema.layer_index(i, LayerField::Roughness)),
        ]);
    }

    for (j, bl) in bilayers.iter().enumerate() {
        let apm = p(schema.bilayer_index(j, BilayerField::Apm));
        let hyd_in = p(schema.bilayer_index(j, BilayerField::HeadHydrationInner));
        let hyd_out = p(schema.bilayer_index(j, BilayerField::HeadHydrationOuter));
        let hyd_tails = p(schema.bilayer_index(j, BilayerField::BilayerHydration));
        let rough = p(schema.bilayer_index(j, BilayerField::Roughness));

        rows.push([bl.v_head_inner / apm, hydrate_sld(hyd_in, solvent, bl.sld_head_inner), rough]);
        rows.push([bl.v_tail_inner / apm, hydrate_sld(hyd_tails, solvent, bl.sld_tail_inner), rough]);
        rows.push([bl.v_tail_outer / apm, hydrate_sld(hyd_tails, solvent, bl.sld_tail_outer), rough]);
        rows.push([bl.v_head_outer / apm, hydrate_sld(hyd_out, solvent, bl.sld_head_outer), rough]);
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::ConversionSettings;
    use crate::domain::model::LayerRecord;

    fn spec() -> BilayerSpec {
        BilayerSpec {
            inner: "DPPC".to_string(),
            outer: "DOPC".to_string(),
            v_head_inner: 321.0,
            v_tail_inner: 782.0,
            v_head_outer: 330.0,
            v_tail_outer: 972.0,
            sld_head_inner: 1.86e-6,
            sld_tail_inner: -4.15e-7,
            sld_head_outer: 1.8e-6,
            sld_tail_outer: -2.1e-7,
        }
    }

    fn schema(layers: usize, bilayers: usize) -> ParameterSchema {
        let settings = ConversionSettings::default();
        let layers: Vec<LayerRecord> = (0..layers)
            .map(|i| LayerRecord {
                name: format!("L{}", i),
                thickness: 10.0 * (i + 1) as f64,
                sld: 1e-6,
                roughness: 3.0,
            })
            .collect();
        let specs = vec![spec(); bilayers];
        ParameterSchema::build(3.0, &layers, &specs, &settings.bounds, &settings.bilayer)
    }

    #[test]
    fn test_hydration_extremes_are_exact() {
        let intrinsic = 1.234567e-6;
        let bulk = 6.35e-6;
        assert_eq!(hydrate_sld(0.0, bulk, intrinsic), intrinsic);
        assert_eq!(hydrate_sld(1.0, bulk, intrinsic), bulk);
        let half = hydrate_sld(0.5, bulk, intrinsic);
        assert!((half - (bulk + intrinsic) / 2.0).abs() < 1e-18);
    }

    #[test]
    fn test_layout_of_layers_and_bilayer() {
        let schema = schema(1, 1);
        let params = [3.0, 12.0, 3.47e-6, 2.0, 64.2, 0.0, 1.0, 0.25, 5.0];
        let bulk_out = [6.35e-6, -0.56e-6];
        let rows = evaluate_stack(&schema, &[spec()], &params, &bulk_out, 2).unwrap();

        assert_eq!(rows.len(), 1 + 4);
        assert_eq!(rows[0], [12.0, 3.47e-6, 2.0]);

        let bl = spec();
        // head-in, tail-in, tail-out, head-out
        assert_eq!(rows[1][0], bl.v_head_inner / 64.2);
        assert_eq!(rows[2][0], bl.v_tail_inner / 64.2);
        assert_eq!(rows[3][0], bl.v_tail_outer / 64.2);
        assert_eq!(rows[4][0], bl.v_head_outer / 64.2);

        assert_eq!(rows[1][1], bl.sld_head_inner);
        assert_eq!(rows[4][1], -0.56e-6);
        assert_eq!(rows[2][1], 0.25 * -0.56e-6 + 0.75 * bl.sld_tail_inner);
        assert_eq!(rows[3][1], 0.25 * -0.56e-6 + 0.75 * bl.sld_tail_outer);

        assert!(rows[1..].iter().all(|row| row[2] == 5.0));
    }

    #[test]
    fn test_contrast_selects_bulk_out() {
        let schema = schema(0, 1);
        let params = [3.0, 60.0, 1.0, 1.0, 1.0, 4.0];
        let bulk_out = [6.35e-6, -0.56e-6];
        let first = evaluate_stack(&schema, &[spec()], &params, &bulk_out, 1).unwrap();
        let second = evaluate_stack(&schema, &[spec()], &params, &bulk_out, 2).unwrap();
        assert!(first.iter().all(|row| row[1] == 6.35e-6));
        assert!(second.iter().all(|row| row[1] == -0.56e-6));
    }

    #[test]
    fn test_rejects_mismatched_input() {
        let schema = schema(2, 0);
        assert!(evaluate_stack(&schema, &[], &[3.0], &[0.0], 1).is_err());
        let params = vec![1.0; schema.len()];
        assert!(evaluate_stack(&schema, &[], &params, &[0.0], 0).is_err());
        assert!(evaluate_stack(&schema, &[], &params, &[0.0], 2).is_err());
        assert!(evaluate_stack(&schema, &[spec()], &params, &[0.0], 1).is_err());
        assert_eq!(evaluate_stack(&schema, &[], &params, &[0.0], 1).unwrap().len(), 2);
    }
}

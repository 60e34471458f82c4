//! Renders the RAT custom-layers model function.

use crate::domain::model::BilayerSpec;
use crate::emit::format::format_g;
use crate::emit::schema::{BilayerField, LayerField, ParameterSchema};
use crate::utils::error::{ConversionError, Result};
use std::fmt::Write;

pub fn model_function_name(base_name: &str) -> String {
    format!("{}_auto", base_name)
}

/// Generates `<base>_auto.m`.
///
/// Every scalar is read as `params(k)` with `k` taken from `schema`, so the
/// driver script declaring the same schema stays in step with this function.
pub fn emit_model(
    base_name: &str,
    schema: &ParameterSchema,
    bilayers: &[BilayerSpec],
) -> Result<String> {
    if bilayers.len() != schema.bilayer_count() {
        return Err(ConversionError::ParameterError {
            message: format!(
                "schema describes {} bilayer(s) but {} were given",
                schema.bilayer_count(),
                bilayers.len()
            ),
        });
    }

    let fn_name = model_function_name(base_name);
    let mut out = String::new();
    write_header(&mut out, &fn_name, schema)?;
    write_unpacking(&mut out, schema)?;
    write_constants(&mut out, schema, bilayers)?;
    write_stack(&mut out, schema)?;
    out.push_str("end\n");
    Ok(out)
}

fn write_header(out: &mut String, fn_name: &str, schema: &ParameterSchema) -> std::fmt::Result {
    writeln!(
        out,
        "function [output, subRough] = {}(params, bulkIn, bulkOut, contrast)",
        fn_name
    )?;
    writeln!(out, "% {}  Auto-generated from ORSO .ort (+ bilayer support)", fn_name)?;
    writeln!(out, "%")?;
    writeln!(out, "% Parameter ordering in 'params':")?;
    writeln!(out, "%   params(1)     Substrate Roughness")?;
    for (i, name) in schema.layer_names().iter().enumerate() {
        writeln!(
            out,
            "%   params({}-{})  Layer {} ({}): [thickness, SLD, roughness]",
            schema.layer_index(i, LayerField::Thickness),
            schema.layer_index(i, LayerField::Roughness),
            i + 1,
            name
        )?;
    }
    for (j, label) in schema.bilayer_labels().iter().enumerate() {
        writeln!(
            out,
            "%   params({}-{})  Bilayer {} ({}): [APM, HeadHydInner, HeadHydOuter, BilayerHydration, Rough]",
            schema.bilayer_index(j, BilayerField::Apm),
            schema.bilayer_index(j, BilayerField::Roughness),
            j + 1,
            label
        )?;
    }
    writeln!(out, "%")?;
    writeln!(out, "% Returns an N x 3 array: [thickness  SLD  roughness]")?;
    writeln!(out, "%")?;
    writeln!(out, "% Bilayer expansion (4 layers):")?;
    writeln!(out, "%   head(inner) -> tail(inner) -> tail(outer) -> head(outer)")?;
    writeln!(out, "%")?;
    writeln!(out, "% Hydration mixes intrinsic SLD with bulkOut(contrast).")?;
    writeln!(out)?;
    writeln!(
        out,
        "subRough = params({});",
        schema.substrate_roughness().index
    )?;
    writeln!(out)
}

fn write_unpacking(out: &mut String, schema: &ParameterSchema) -> std::fmt::Result {
    writeln!(out, "% ---- Unpack non-bilayer layer parameters ----")?;
    for (i, name) in schema.layer_names().iter().enumerate() {
        let n = i + 1;
        writeln!(out, "% Layer {}: {}", n, name)?;
        writeln!(out, "layer{}Thick = params({});", n, schema.layer_index(i, LayerField::Thickness))?;
        writeln!(out, "layer{}SLD   = params({});", n, schema.layer_index(i, LayerField::Sld))?;
        writeln!(out, "layer{}Rough = params({});", n, schema.layer_index(i, LayerField::Roughness))?;
        writeln!(out)?;
    }

    writeln!(out, "% ---- Unpack bilayer fit parameters ----")?;
    for (j, label) in schema.bilayer_labels().iter().enumerate() {
        let n = j + 1;
        let idx = |field| schema.bilayer_index(j, field);
        writeln!(out, "% Bilayer {}: {}", n, label)?;
        writeln!(out, "bilayer{}APM              = params({});", n, idx(BilayerField::Apm))?;
        writeln!(out, "bilayer{}HeadHydInner     = params({});", n, idx(BilayerField::HeadHydrationInner))?;
        writeln!(out, "bilayer{}HeadHydOuter     = params({});", n, idx(BilayerField::HeadHydrationOuter))?;
        writeln!(out, "bilayer{}BilayerHydration = params({});", n, idx(BilayerField::BilayerHydration))?;
        writeln!(out, "bilayer{}Rough            = params({});", n, idx(BilayerField::Roughness))?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_constants(
    out: &mut String,
    schema: &ParameterSchema,
    bilayers: &[BilayerSpec],
) -> std::fmt::Result {
    if bilayers.is_empty() {
        return Ok(());
    }
    writeln!(out, "% ---- Bilayer physical constants (volumes in A^3, SLDs in A^-2) ----")?;
    for (j, (bl, label)) in bilayers.iter().zip(schema.bilayer_labels()).enumerate() {
        let n = j + 1;
        writeln!(out, "% Bilayer {} constants ({})", n, label)?;
        let constants = [
            ("vHeadInner", bl.v_head_inner),
            ("vTailInner", bl.v_tail_inner),
            ("vHeadOuter", bl.v_head_outer),
            ("vTailOuter", bl.v_tail_outer),
            ("sldHeadInner", bl.sld_head_inner),
            ("sldTailInner", bl.sld_tail_inner),
            ("sldHeadOuter", bl.sld_head_outer),
            ("sldTailOuter", bl.sld_tail_outer),
        ];
        for (name, value) in constants {
            writeln!(out, "{}{} = {};", name, n, format_g(value))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_stack(out: &mut String, schema: &ParameterSchema) -> std::fmt::Result {
    writeln!(out, "% ---- Build final layer stack ----")?;
    writeln!(out, "output = [];")?;
    writeln!(out)?;

    for n in 1..=schema.layer_count() {
        writeln!(out, "% Non-bilayer layer {}", n)?;
        writeln!(out, "L{n} = [layer{n}Thick, layer{n}SLD, layer{n}Rough];")?;
        writeln!(out, "output = [output; L{n}];")?;
        writeln!(out)?;
    }

    for n in 1..=schema.bilayer_count() {
        writeln!(out, "% Bilayer {} -> 4 layers (head / tail / tail / head)", n)?;
        writeln!(out, "headInnerThick{n} = vHeadInner{n} / bilayer{n}APM;")?;
        writeln!(out, "tailInnerThick{n} = vTailInner{n} / bilayer{n}APM;")?;
        writeln!(out, "tailOuterThick{n} = vTailOuter{n} / bilayer{n}APM;")?;
        writeln!(out, "headOuterThick{n} = vHeadOuter{n} / bilayer{n}APM;")?;
        writeln!(
            out,
            "headInnerSLD{n} = bilayer{n}HeadHydInner     * bulkOut(contrast) + (1 - bilayer{n}HeadHydInner)     * sldHeadInner{n};"
        )?;
        writeln!(
            out,
            "headOuterSLD{n} = bilayer{n}HeadHydOuter     * bulkOut(contrast) + (1 - bilayer{n}HeadHydOuter)     * sldHeadOuter{n};"
        )?;
        writeln!(
            out,
            "tailInnerSLD{n} = bilayer{n}BilayerHydration * bulkOut(contrast) + (1 - bilayer{n}BilayerHydration) * sldTailInner{n};"
        )?;
        writeln!(
            out,
            "tailOuterSLD{n} = bilayer{n}BilayerHydration * bulkOut(contrast) + (1 - bilayer{n}BilayerHydration) * sldTailOuter{n};"
        )?;
        writeln!(out, "bilayerRough{n} = bilayer{n}Rough;")?;
        writeln!(out, "headInner{n} = [headInnerThick{n}, headInnerSLD{n}, bilayerRough{n}];")?;
        writeln!(out, "tailInner{n} = [tailInnerThick{n}, tailInnerSLD{n}, bilayerRough{n}];")?;
        writeln!(out, "tailOuter{n} = [tailOuterThick{n}, tailOuterSLD{n}, bilayerRough{n}];")?;
        writeln!(out, "headOuter{n} = [headOuterThick{n}, headOuterSLD{n}, bilayerRough{n}];")?;
        writeln!(
            out,
            "bilayerBlock{n} = [headInner{n}; tailInner{n}; tailOuter{n}; headOuter{n}];"
        )?;
        writeln!(out, "output = [output; bilayerBlock{n}];")?;
        writeln!(out)?;
    }
    Ok(())
}

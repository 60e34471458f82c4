//! Renders the RAT driver script that builds and runs the multi-contrast
//! project around the generated model function.

use crate::config::settings::ConversionSettings;
use crate::domain::model::{BulkRecord, ExtractedSample};
use crate::emit::format::format_g;
use crate::emit::model::model_function_name;
use crate::emit::schema::{Bounds, ParamRole, ParameterSchema};
use crate::utils::error::Result;
use crate::utils::naming::{make_unique, matlab_quote, normalize_identifier, sanitize_identifier};
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

pub const CUSTOM_MODEL_NAME: &str = "ORSO auto model";
pub const SCALEFACTOR_NAME: &str = "Scalefactor 1";
pub const RESOLUTION_NAME: &str = "Resolution 1";

pub fn driver_script_name(base_name: &str) -> String {
    format!("{}_auto_script", base_name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulkDeclaration {
    pub name: String,
    pub bounds: Bounds,
}

/// De-duplicates the bulks of one side. Same name and same rounded SLD map
/// to one declaration; a name reused with another SLD gets `_2`, `_3`, …
#[derive(Debug)]
struct BulkRegistry {
    key_decimals: u32,
    sld_span: f64,
    zero_window: f64,
    used: HashSet<String>,
    by_key: HashMap<(String, i64), String>,
    declared: Vec<BulkDeclaration>,
}

impl BulkRegistry {
    fn new(settings: &ConversionSettings) -> Self {
        Self {
            key_decimals: settings.bulk.key_decimals,
            sld_span: settings.bulk.sld_span,
            zero_window: settings.bounds.zero_window,
            used: HashSet::new(),
            by_key: HashMap::new(),
            declared: Vec::new(),
        }
    }

    fn ensure(&mut self, bulk: &BulkRecord) -> String {
        let normalized = BulkRecord {
            name: normalize_identifier(&bulk.name),
            sld: bulk.sld,
        };
        let key = normalized.dedup_key(self.key_decimals);
        if let Some(name) = self.by_key.get(&key) {
            return name.clone();
        }

        let name = make_unique(&normalized.name, &mut self.used, "_");
        self.declared.push(BulkDeclaration {
            name: name.clone(),
            bounds: Bounds::span(bulk.sld, self.sld_span, self.zero_window),
        });
        self.by_key.insert(key, name.clone());
        name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContrastWiring {
    /// 1-based dataset position; also the `data_cells` index.
    pub index: usize,
    pub identifier: String,
    /// `None` for contrasts without layer data.
    pub bulks: Option<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct DriverScript {
    pub source: String,
    pub bulk_ins: Vec<BulkDeclaration>,
    pub bulk_outs: Vec<BulkDeclaration>,
    pub wiring: Vec<ContrastWiring>,
}

/// Generates `<base>_auto_script.m` from the same schema the model function
/// was rendered from.
pub fn emit_driver(
    base_name: &str,
    schema: &ParameterSchema,
    sample: &ExtractedSample,
    data_ref: &str,
    settings: &ConversionSettings,
) -> Result<DriverScript> {
    let mut bulk_in = BulkRegistry::new(settings);
    let mut bulk_out = BulkRegistry::new(settings);
    let mut identifiers = HashSet::new();

    let wiring: Vec<ContrastWiring> = sample
        .contrasts
        .iter()
        .map(|contrast| {
            let mut base = sanitize_identifier(&normalize_identifier(&contrast.display_name));
            if base.trim_matches('_').is_empty() {
                base = format!("Contrast_{}", contrast.index);
            }
            ContrastWiring {
                index: contrast.index,
                identifier: make_unique(&base, &mut identifiers, "_"),
                bulks: contrast
                    .stack
                    .as_ref()
                    .map(|stack| (bulk_in.ensure(&stack.bulk_in), bulk_out.ensure(&stack.bulk_out))),
            }
        })
        .collect();

    let mut out = String::new();
    let fn_name = model_function_name(base_name);
    let data_ref = data_ref.replace('\\', "/");
    let data_ref = data_ref.trim_start_matches('/');

    writeln!(
        out,
        "% {}.m - Auto-generated from ORSO (+ bilayer support)",
        driver_script_name(base_name)
    )?;
    writeln!(out, "% Source: {}", normalize_identifier(&sample.source_name))?;
    writeln!(out)?;
    writeln!(
        out,
        "problem = createProject(name='{}_Project', ...",
        matlab_quote(base_name)
    )?;
    writeln!(out, "                        model='custom layers', ...")?;
    writeln!(out, "                        geometry='substrate/liquid', ...")?;
    writeln!(out, "                        calcType='normal');")?;
    writeln!(out)?;
    writeln!(out, "problem.showPriors = true;")?;
    writeln!(out)?;

    write_parameters(&mut out, schema)?;

    let [lo, value, hi] = settings.scalefactor.bounds;
    writeln!(
        out,
        "problem.setScalefactor(1, 'name','{}', 'value',{}, 'min',{}, 'max',{}, 'fit',true);",
        SCALEFACTOR_NAME,
        format_g(value),
        format_g(lo),
        format_g(hi)
    )?;
    writeln!(out)?;

    writeln!(out, "% ---------- Bulks ----------")?;
    for bulk in &bulk_in.declared {
        write_bulk(&mut out, "addBulkIn", bulk)?;
    }
    for bulk in &bulk_out.declared {
        write_bulk(&mut out, "addBulkOut", bulk)?;
    }
    writeln!(out)?;

    writeln!(out, "% ---------- Custom model ----------")?;
    writeln!(
        out,
        "problem.addCustomFile('{}','{}.m','matlab',pwd);",
        CUSTOM_MODEL_NAME, fn_name
    )?;
    writeln!(out)?;

    let quoted_ref = matlab_quote(data_ref);
    writeln!(out, "% ---------- Data ----------")?;
    writeln!(out, "data_cells = readOrso('{}');", quoted_ref)?;
    writeln!(out, "numContrasts = length(data_cells);")?;
    writeln!(
        out,
        "fprintf('Detected %d data blocks in {}\\n', numContrasts);",
        quoted_ref
    )?;
    writeln!(
        out,
        "numContrasts = min(numContrasts, {});",
        sample.contrasts.len()
    )?;
    writeln!(out)?;

    writeln!(out, "% ---------- Contrasts ----------")?;
    let [bg_lo, bg_value, bg_hi] = settings.background.bounds;
    for contrast in &wiring {
        let (bulk_in_name, bulk_out_name) = match &contrast.bulks {
            Some(bulks) => bulks,
            None => {
                writeln!(
                    out,
                    "% Contrast {} ({}) skipped: no usable layer data",
                    contrast.index, contrast.identifier
                )?;
                writeln!(out)?;
                continue;
            }
        };
        let i = contrast.index;
        writeln!(out, "if {} <= numContrasts", i)?;
        writeln!(out, "    backs = sprintf('Background Auto %d', {});", i)?;
        writeln!(
            out,
            "    problem.addBackgroundParam(backs, {}, {}, {}, true);",
            format_g(bg_lo),
            format_g(bg_value),
            format_g(bg_hi)
        )?;
        writeln!(out, "    problem.addBackground(backs, 'constant', backs);")?;
        writeln!(out)?;
        writeln!(out, "    dataName = '{}';", contrast.identifier)?;
        writeln!(out, "    problem.addData(dataName, data_cells{{{}}}, [], []);", i)?;
        writeln!(out)?;
        writeln!(out, "    problem.addContrast('name','{}', ...", contrast.identifier)?;
        writeln!(out, "                        'background',backs, ...")?;
        writeln!(out, "                        'resolution','{}', ...", RESOLUTION_NAME)?;
        writeln!(out, "                        'scalefactor','{}', ...", SCALEFACTOR_NAME)?;
        writeln!(out, "                        'BulkIn','{}', ...", matlab_quote(bulk_in_name))?;
        writeln!(out, "                        'BulkOut','{}', ...", matlab_quote(bulk_out_name))?;
        writeln!(out, "                        'data',dataName, ...")?;
        writeln!(out, "                        'model','{}');", CUSTOM_MODEL_NAME)?;
        writeln!(out, "end")?;
        writeln!(out)?;
    }

    writeln!(out, "% ---------- Run ----------")?;
    writeln!(out, "controls = controlsClass();")?;
    writeln!(out, "[problem, results] = RAT(problem, controls);")?;
    writeln!(out, "plotRefSLD(problem, results);")?;
    writeln!(out)?;
    writeln!(out, "projectToJson(problem, 'project.json');")?;
    writeln!(out, "controlsToJson(controls, 'controls.json');")?;

    Ok(DriverScript {
        source: out,
        bulk_ins: bulk_in.declared,
        bulk_outs: bulk_out.declared,
        wiring,
    })
}

fn write_parameters(out: &mut String, schema: &ParameterSchema) -> std::fmt::Result {
    writeln!(out, "% ---------- Parameters ----------")?;
    let substrate = schema.substrate_roughness();
    writeln!(
        out,
        "problem.setParameter({}, 'name','{}', 'min',{}, 'value',{}, 'max',{}, 'fit',{});",
        substrate.index,
        matlab_quote(&substrate.name),
        format_g(substrate.bounds.min),
        format_g(substrate.bounds.value),
        format_g(substrate.bounds.max),
        substrate.fit
    )?;
    writeln!(out)?;

    let group = &schema.params()[1..];
    if group.is_empty() {
        writeln!(out, "% No layer or bilayer parameters")?;
        return writeln!(out);
    }

    writeln!(out, "params = {{")?;
    for param in group {
        if let ParamRole::Bilayer { bilayer, .. } = param.role {
            if param.index == schema.bilayer_index(bilayer, crate::emit::schema::BilayerField::Apm) {
                writeln!(
                    out,
                    "  % Bilayer {} parameters ({})",
                    bilayer + 1,
                    schema.bilayer_labels()[bilayer]
                )?;
            }
        }
        writeln!(
            out,
            "  {{'{}', {}, {}, {}, {}}};",
            matlab_quote(&param.name),
            format_g(param.bounds.min),
            format_g(param.bounds.value),
            format_g(param.bounds.max),
            param.fit
        )?;
    }
    writeln!(out, "}};")?;
    writeln!(out, "problem.addParameterGroup(params);")?;
    writeln!(out)
}

fn write_bulk(out: &mut String, method: &str, bulk: &BulkDeclaration) -> std::fmt::Result {
    writeln!(
        out,
        "problem.{}('{}', {}, {}, {}, false);",
        method,
        matlab_quote(&bulk.name),
        format_g(bulk.bounds.min),
        format_g(bulk.bounds.value),
        format_g(bulk.bounds.max)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ContrastRecord, ContrastStack, LayerRecord};

    fn layer(name: &str, sld: f64) -> LayerRecord {
        LayerRecord {
            name: name.to_string(),
            thickness: 12.0,
            sld,
            roughness: 3.0,
        }
    }

    fn contrast(index: usize, name: &str, bulk_in: (&str, f64), bulk_out: (&str, f64)) -> ContrastRecord {
        ContrastRecord {
            index,
            display_name: name.to_string(),
            stack: Some(ContrastStack {
                layers: vec![layer(bulk_in.0, bulk_in.1), layer("SiO2", 3.47e-6), layer(bulk_out.0, bulk_out.1)],
                bulk_in: BulkRecord {
                    name: bulk_in.0.to_string(),
                    sld: bulk_in.1,
                },
                bulk_out: BulkRecord {
                    name: bulk_out.0.to_string(),
                    sld: bulk_out.1,
                },
            }),
        }
    }

    fn sample(contrasts: Vec<ContrastRecord>) -> ExtractedSample {
        ExtractedSample {
            source_name: "test.ort".to_string(),
            contrasts,
            bilayer_tokens: vec![],
            bilayers: vec![],
        }
    }

    fn schema_for(sample: &ExtractedSample) -> ParameterSchema {
        let settings = ConversionSettings::default();
        let stack = sample.reference_stack().unwrap();
        ParameterSchema::build(3.0, stack.internal_layers(), &sample.bilayers, &settings.bounds, &settings.bilayer)
    }

    fn emit(sample: &ExtractedSample) -> DriverScript {
        emit_driver("demo", &schema_for(sample), sample, "data/test.ort", &ConversionSettings::default()).unwrap()
    }

    #[test]
    fn test_bulk_deduplication() {
        let sample = sample(vec![
            contrast(1, "a", ("Si", 2.07e-6), ("D2O", 6.0e-6)),
            contrast(2, "b", ("Si", 2.07e-6), ("D2O", 6.0e-6)),
            contrast(3, "c", ("Si", 2.07e-6), ("D2O", 6.1e-6)),
        ]);
        let script = emit(&sample);

        let names: Vec<&str> = script.bulk_outs.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["D2O", "D2O_2"]);
        assert_eq!(script.bulk_ins.len(), 1);
        assert_eq!(script.source.matches("problem.addBulkOut(").count(), 2);
        assert_eq!(script.source.matches("problem.addBulkIn(").count(), 1);
        assert!(script.source.contains("problem.addBulkOut('D2O_2', 5.978e-06, 6.1e-06, 6.222e-06, false);"));
        assert_eq!(script.wiring[2].bulks, Some(("Si".to_string(), "D2O_2".to_string())));
        assert!(script.source.contains("'BulkOut','D2O_2'"));
    }

    #[test]
    fn test_bulk_tolerance_is_configurable() {
        let sample = sample(vec![
            contrast(1, "a", ("Si", 2.07e-6), ("D2O", 6.0e-6)),
            contrast(2, "b", ("Si", 2.07e-6), ("D2O", 6.1e-6)),
        ]);
        let mut settings = ConversionSettings::default();
        settings.bulk.key_decimals = 6;
        let script = emit_driver("demo", &schema_for(&sample), &sample, "data/test.ort", &settings).unwrap();
        assert_eq!(script.bulk_outs.len(), 1);
    }

    #[test]
    fn test_zero_sld_bulk_gets_window() {
        let sample = sample(vec![contrast(1, "a", ("Air", 0.0), ("D2O", 6.36e-6))]);
        let script = emit(&sample);
        assert!(script.source.contains("problem.addBulkIn('Air', -1e-06, 0, 1e-06, false);"));
    }

    #[test]
    fn test_parameter_declarations() {
        let sample = sample(vec![contrast(1, "a", ("Si", 2.07e-6), ("D2O", 6.36e-6))]);
        let script = emit(&sample).source;

        assert!(script.contains(
            "problem.setParameter(1, 'name','Substrate Roughness', 'min',2.1, 'value',3, 'max',3.9, 'fit',true);"
        ));
        assert!(script.contains("  {'SiO2 thickness', 8.4, 12, 15.6, true};"));
        assert!(script.contains("  {'SiO2 rough', 1.5, 3, 4.5, true};"));
        assert!(script.contains("problem.addParameterGroup(params);"));
        assert!(script.contains(
            "problem.setScalefactor(1, 'name','Scalefactor 1', 'value',1, 'min',0.5, 'max',2, 'fit',true);"
        ));
    }

    #[test]
    fn test_contrast_wiring() {
        let mut skipped = contrast(2, r"lipid\_H2O", ("Si", 2.07e-6), ("H2O", -5.6e-7));
        skipped.stack = None;
        let sample = sample(vec![
            contrast(1, r"lipid\_D2O", ("Si", 2.07e-6), ("D2O", 6.36e-6)),
            skipped,
            contrast(3, "lipid 3", ("Si", 2.07e-6), ("D2O", 6.36e-6)),
        ]);
        let script = emit(&sample).source;

        assert!(script.contains("data_cells = readOrso('data/test.ort');"));
        assert!(script.contains("numContrasts = min(numContrasts, 3);"));
        assert!(script.contains("if 1 <= numContrasts"));
        assert!(!script.contains("if 2 <= numContrasts"));
        assert!(script.contains("% Contrast 2 (lipid__H2O) skipped: no usable layer data"));
        assert!(script.contains("if 3 <= numContrasts"));
        assert!(script.contains("    problem.addData(dataName, data_cells{3}, [], []);"));
        assert!(script.contains("problem.addContrast('name','lipid_3', ..."));
        assert!(script.contains("problem.addBackgroundParam(backs, 1e-08, 1e-06, 0.0001, true);"));
        assert!(script.contains("problem.addCustomFile('ORSO auto model','demo_auto.m','matlab',pwd);"));
        assert!(script.trim_end().ends_with("controlsToJson(controls, 'controls.json');"));
    }

    #[test]
    fn test_duplicate_contrast_identifiers_are_made_unique() {
        let sample = sample(vec![
            contrast(1, "run", ("Si", 2.07e-6), ("D2O", 6.36e-6)),
            contrast(2, "run", ("Si", 2.07e-6), ("D2O", 6.36e-6)),
        ]);
        let script = emit(&sample);
        let ids: Vec<&str> = script.wiring.iter().map(|w| w.identifier.as_str()).collect();
        assert_eq!(ids, vec!["run", "run_2"]);
    }

    #[test]
    fn test_quotes_are_escaped() {
        let sample = sample(vec![contrast(1, "a", ("Si", 2.07e-6), ("O'Brien", 1e-6))]);
        let script = emit(&sample).source;
        assert!(script.contains("problem.addBulkOut('O''Brien',"));
    }
}

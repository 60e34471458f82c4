use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{
    ContrastSummary, ConversionSummary, ExtractedSample, GeneratedArtifacts,
};
use crate::domain::ports::LipidPropertySource;
use crate::emit::{
    driver_script_name, emit_driver, emit_model, evaluate_stack, model_function_name,
    ParameterSchema,
};
use crate::extract::ModelExtractor;
use crate::lipids::{LipidConstantResolver, LipidTable};
use crate::orso::OrsoFile;
use crate::utils::error::{ConversionError, Result};

pub const SUMMARY_FILE: &str = "conversion_summary.json";
pub const DATA_DIR: &str = "data";

/// `.ort` → RAT conversion as an extract/transform/load pipeline.
///
/// The storage is rooted at the output directory; the input file is read
/// from wherever the config points.
pub struct OrtPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    lipids: Option<LipidTable>,
}

impl<S: Storage, C: ConfigProvider> OrtPipeline<S, C> {
    /// Loads the lipid table named in the settings.
    pub fn new(storage: S, config: C) -> Result<Self> {
        let source = config.settings().lipids.source();
        let lipids = LipidTable::load(&source)?;
        match &lipids {
            Some(table) => tracing::debug!(
                "Lipid table '{}' with {} entries",
                table.name(),
                table.len()
            ),
            None => tracing::debug!("No lipid table, bilayers cannot be resolved"),
        }
        Ok(Self::with_lipid_table(storage, config, lipids))
    }

    pub fn with_lipid_table(storage: S, config: C, lipids: Option<LipidTable>) -> Self {
        Self {
            storage,
            config,
            lipids,
        }
    }

    fn input_file_name(&self) -> String {
        let path = self.config.ort_file();
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// Path of the input copy relative to the generated files.
    fn data_ref(&self) -> String {
        format!("{}/{}", DATA_DIR, self.input_file_name())
    }

    fn output_file(&self, name: &str) -> String {
        format!("{}/{}", self.config.output_path().trim_end_matches('/'), name)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for OrtPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractedSample> {
        let path = self.config.ort_file();
        tracing::debug!("Reading ORSO file: {}", path.display());
        let content = tokio::fs::read_to_string(path).await?;
        let file = OrsoFile::parse(&self.input_file_name(), &content)?;

        let source = self.lipids.as_ref().map(|t| t as &dyn LipidPropertySource);
        let resolver = LipidConstantResolver::new(source)
            .with_reference_lipid(&self.config.settings().lipids.reference_lipid);
        ModelExtractor::new(&resolver).extract(file)
    }

    async fn transform(&self, sample: ExtractedSample) -> Result<GeneratedArtifacts> {
        let settings = self.config.settings();
        let base_name = self.config.base_name();

        let reference = sample
            .reference_stack()
            .ok_or_else(|| ConversionError::NoUsableContrasts {
                source_name: sample.source_name.clone(),
            })?;
        let substrate_roughness = reference
            .layers
            .first()
            .map(|l| l.roughness)
            .unwrap_or(crate::domain::model::DEFAULT_ROUGHNESS);

        let schema = ParameterSchema::build(
            substrate_roughness,
            reference.internal_layers(),
            &sample.bilayers,
            &settings.bounds,
            &settings.bilayer,
        );
        tracing::debug!(
            "Parameter schema: {} entries ({} layers, {} bilayers)",
            schema.len(),
            schema.layer_count(),
            schema.bilayer_count()
        );

        let model_source = emit_model(&base_name, &schema, &sample.bilayers)?;
        let driver = emit_driver(&base_name, &schema, &sample, &self.data_ref(), settings)?;

        // RAT numbers contrasts in the order they were added.
        let bulk_out_slds: Vec<f64> = sample.bulk_outs().iter().map(|b| b.sld).collect();
        let nominal = schema.nominal_values();
        let mut position = 0;
        let mut contrasts = Vec::with_capacity(sample.contrasts.len());
        for (record, wiring) in sample.contrasts.iter().zip(&driver.wiring) {
            let nominal_stack = match &record.stack {
                Some(_) => {
                    position += 1;
                    evaluate_stack(&schema, &sample.bilayers, &nominal, &bulk_out_slds, position)?
                }
                None => Vec::new(),
            };
            contrasts.push(ContrastSummary {
                index: record.index,
                name: wiring.identifier.clone(),
                wired: wiring.bulks.is_some(),
                bulk_in: wiring.bulks.as_ref().map(|(bulk_in, _)| bulk_in.clone()),
                bulk_out: wiring.bulks.as_ref().map(|(_, bulk_out)| bulk_out.clone()),
                nominal_stack,
            });
        }

        let model_file = format!("{}.m", model_function_name(&base_name));
        let driver_file = format!("{}.m", driver_script_name(&base_name));
        let summary = ConversionSummary {
            generated_at: chrono::Utc::now(),
            source: sample.source_name.clone(),
            base_name: base_name.clone(),
            model_file: model_file.clone(),
            driver_file: driver_file.clone(),
            parameters: schema.names(),
            contrasts,
            bilayers: sample.bilayers.clone(),
        };

        Ok(GeneratedArtifacts {
            model_file,
            model_source,
            driver_file,
            driver_source: driver.source,
            summary,
        })
    }

    async fn load(&self, artifacts: GeneratedArtifacts) -> Result<String> {
        let input = tokio::fs::read(self.config.ort_file()).await?;
        let data_ref = self.data_ref();
        self.storage.write_file(&data_ref, &input).await?;
        tracing::info!("✔ Copied ORSO data file → {}", self.output_file(&data_ref));

        self.storage
            .write_file(&artifacts.model_file, artifacts.model_source.as_bytes())
            .await?;
        tracing::info!("✔ Wrote model file: {}", self.output_file(&artifacts.model_file));

        self.storage
            .write_file(&artifacts.driver_file, artifacts.driver_source.as_bytes())
            .await?;
        tracing::info!(
            "✔ Wrote driver script: {}",
            self.output_file(&artifacts.driver_file)
        );

        let summary = serde_json::to_vec_pretty(&artifacts.summary)?;
        self.storage.write_file(SUMMARY_FILE, &summary).await?;
        tracing::debug!("Wrote {}", self.output_file(SUMMARY_FILE));

        Ok(self.output_file(&artifacts.driver_file))
    }
}

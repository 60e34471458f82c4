use crate::core::{GeneratedArtifacts, Pipeline};
use crate::utils::error::Result;

pub struct ConversionEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ConversionEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Runs extract, transform and load; returns the driver script path.
    pub async fn run(&self) -> Result<String> {
        let artifacts = self.preview().await?;

        tracing::info!("💾 Writing outputs...");
        let output_path = self.pipeline.load(artifacts).await?;
        tracing::info!("✅ Conversion complete: {}", output_path);

        Ok(output_path)
    }

    /// Extract and transform only; nothing is written.
    pub async fn preview(&self) -> Result<GeneratedArtifacts> {
        tracing::info!("🔍 Extracting sample model...");
        let sample = self.pipeline.extract().await?;
        tracing::info!(
            "📋 {} contrast(s), {} usable, {} bilayer(s)",
            sample.contrasts.len(),
            sample.usable().count(),
            sample.bilayers.len()
        );

        tracing::info!("🔧 Generating MATLAB model and driver...");
        let artifacts = self.pipeline.transform(sample).await?;
        tracing::info!(
            "📐 {} fit parameter(s) shared by {} and {}",
            artifacts.summary.parameters.len(),
            artifacts.model_file,
            artifacts.driver_file
        );

        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExtractedSample;
    use crate::domain::model::ConversionSummary;
    use crate::utils::error::ConversionError;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        fail_extract: bool,
        loaded: AtomicBool,
    }

    impl StubPipeline {
        fn new(fail_extract: bool) -> Self {
            Self {
                fail_extract,
                loaded: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<ExtractedSample> {
            if self.fail_extract {
                return Err(ConversionError::NoUsableContrasts {
                    source_name: "stub.ort".to_string(),
                });
            }
            Ok(ExtractedSample {
                source_name: "stub.ort".to_string(),
                contrasts: vec![],
                bilayer_tokens: vec![],
                bilayers: vec![],
            })
        }

        async fn transform(&self, sample: ExtractedSample) -> Result<GeneratedArtifacts> {
            Ok(GeneratedArtifacts {
                model_file: "stub_auto.m".to_string(),
                model_source: String::new(),
                driver_file: "stub_auto_script.m".to_string(),
                driver_source: String::new(),
                summary: ConversionSummary {
                    generated_at: chrono::Utc::now(),
                    source: sample.source_name,
                    base_name: "stub".to_string(),
                    model_file: "stub_auto.m".to_string(),
                    driver_file: "stub_auto_script.m".to_string(),
                    parameters: vec!["Substrate Roughness".to_string()],
                    contrasts: vec![],
                    bilayers: vec![],
                },
            })
        }

        async fn load(&self, artifacts: GeneratedArtifacts) -> Result<String> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok(format!("out/{}", artifacts.driver_file))
        }
    }

    #[tokio::test]
    async fn test_run_calls_every_stage() {
        let engine = ConversionEngine::new(StubPipeline::new(false));
        let output = engine.run().await.unwrap();
        assert_eq!(output, "out/stub_auto_script.m");
        assert!(engine.pipeline.loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_preview_does_not_load() {
        let engine = ConversionEngine::new(StubPipeline::new(false));
        let artifacts = engine.preview().await.unwrap();
        assert_eq!(artifacts.summary.parameters.len(), 1);
        assert!(!engine.pipeline.loaded.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_extract_error_stops_run() {
        let engine = ConversionEngine::new(StubPipeline::new(true));
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, ConversionError::NoUsableContrasts { .. }));
        assert!(!engine.pipeline.loaded.load(Ordering::SeqCst));
    }
}

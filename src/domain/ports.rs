use crate::config::settings::ConversionSettings;
use crate::domain::model::{ExtractedSample, GeneratedArtifacts};
use crate::lipids::table::LipidEntry;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn ort_file(&self) -> &Path;
    fn output_path(&self) -> &str;
    fn base_name(&self) -> String;
    fn settings(&self) -> &ConversionSettings;
}

/// Queried by identifier; knows nothing about fallbacks.
pub trait LipidPropertySource: Send + Sync {
    fn lookup(&self, lipid_id: &str) -> Option<&LipidEntry>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractedSample>;
    async fn transform(&self, sample: ExtractedSample) -> Result<GeneratedArtifacts>;
    async fn load(&self, artifacts: GeneratedArtifacts) -> Result<String>;
}

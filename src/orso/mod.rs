//! Minimal reader for ORSO `.ort` reflectivity files.
//!
//! Header lines start with `#`; after dropping one leading `# ` they form a
//! YAML document. A comment block that follows numeric data rows opens the
//! next dataset, whose header is merged onto the first dataset's header.

pub mod header;
pub mod materials;
pub mod model_language;
pub mod units;

use crate::orso::header::{merge_headers, OrsoHeader};
use crate::orso::model_language::SampleModel;
use crate::utils::error::{ConversionError, Result};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct OrsoDataset {
    /// 1-based position in the file.
    pub index: usize,
    pub header: OrsoHeader,
    pub data_rows: usize,
}

impl OrsoDataset {
    pub fn sample_name(&self) -> Option<&str> {
        self.header
            .data_source
            .as_ref()
            .and_then(|ds| ds.sample.as_ref())
            .and_then(|s| s.name.as_deref())
    }

    pub fn model(&self) -> Option<&SampleModel> {
        self.header
            .data_source
            .as_ref()
            .and_then(|ds| ds.sample.as_ref())
            .and_then(|s| s.model.as_ref())
    }

    pub fn model_mut(&mut self) -> Option<&mut SampleModel> {
        self.header
            .data_source
            .as_mut()
            .and_then(|ds| ds.sample.as_mut())
            .and_then(|s| s.model.as_mut())
    }
}

#[derive(Debug, Clone)]
pub struct OrsoFile {
    pub source_name: String,
    pub datasets: Vec<OrsoDataset>,
}

struct RawBlock {
    header: String,
    data_rows: usize,
}

fn split_blocks(content: &str) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut header = String::new();
    let mut data_rows = 0;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.strip_prefix('#') {
            Some(rest) => {
                if data_rows > 0 {
                    blocks.push(RawBlock {
                        header: std::mem::take(&mut header),
                        data_rows,
                    });
                    data_rows = 0;
                }
                let yaml_line = rest.strip_prefix(' ').unwrap_or(rest);
                if yaml_line.trim() == "---" {
                    continue;
                }
                header.push_str(yaml_line);
                header.push('\n');
            }
            None => data_rows += 1,
        }
    }

    if !header.trim().is_empty() || data_rows > 0 {
        blocks.push(RawBlock { header, data_rows });
    }
    blocks
}

impl OrsoFile {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(&source_name, &content)
    }

    pub fn parse(source_name: &str, content: &str) -> Result<Self> {
        let blocks = split_blocks(content);
        if blocks.is_empty() {
            return Err(ConversionError::OrsoFormat {
                dataset: 0,
                message: "file contains no header".to_string(),
            });
        }

        let mut base: Option<serde_yaml::Value> = None;
        let mut datasets = Vec::with_capacity(blocks.len());

        for (i, block) in blocks.into_iter().enumerate() {
            let index = i + 1;
            let parsed: serde_yaml::Value =
                serde_yaml::from_str(&block.header).map_err(|e| ConversionError::OrsoFormat {
                    dataset: index,
                    message: e.to_string(),
                })?;

            let merged = match base.as_ref() {
                Some(first) => {
                    let mut merged = first.clone();
                    merge_headers(&mut merged, parsed);
                    merged
                }
                None => parsed,
            };
            if base.is_none() {
                base = Some(merged.clone());
            }

            let header: OrsoHeader = if merged.is_null() {
                OrsoHeader::default()
            } else {
                serde_yaml::from_value(merged).map_err(|e| ConversionError::OrsoFormat {
                    dataset: index,
                    message: e.to_string(),
                })?
            };

            tracing::debug!(
                "Dataset {}: {} data rows, sample '{}'",
                index,
                block.data_rows,
                header
                    .data_source
                    .as_ref()
                    .and_then(|ds| ds.sample.as_ref())
                    .and_then(|s| s.name.as_deref())
                    .unwrap_or("-")
            );

            datasets.push(OrsoDataset {
                index,
                header,
                data_rows: block.data_rows,
            });
        }

        Ok(Self {
            source_name: source_name.to_string(),
            datasets,
        })
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

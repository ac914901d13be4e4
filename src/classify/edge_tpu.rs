use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::labels::LabelMap;
use super::traits::{Classifier, InferenceEngine};
use super::types::{Image, Prediction, ProcessingUnit};

/// Label reported when the accelerator returns no candidate
pub const NO_CANDIDATE_LABEL: &str = "other";

/// Classifier for a USB/PCIe edge accelerator
pub struct EdgeTpuClassifier {
    engine: Arc<dyn InferenceEngine>,
    labels: Arc<LabelMap>,
}

impl EdgeTpuClassifier {
    pub fn new(engine: Arc<dyn InferenceEngine>, labels: Arc<LabelMap>) -> Self {
        Self { engine, labels }
    }

    /// Labels from an indexed `NNNN label, synonyms` file
    pub fn from_label_file(engine: Arc<dyn InferenceEngine>, path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| crate::BenchError::io(path, e))?;
        let labels = LabelMap::parse_indexed(&text, path)?;
        Ok(Self::new(engine, Arc::new(labels)))
    }
}

#[async_trait]
impl Classifier for EdgeTpuClassifier {
    fn processing_unit(&self) -> ProcessingUnit {
        ProcessingUnit::EdgeTpu
    }

    async fn classify(&self, image: &Image) -> Result<Prediction> {
        let candidates = self.engine.infer(image).await?;
        let Some(&(id, _)) = candidates.first() else {
            return Ok(Prediction::new(NO_CANDIDATE_LABEL, 0.0));
        };
        self.labels
            .decode(&candidates)
            .ok_or_else(|| anyhow!("class id {} missing from edge label file", id))
    }
}

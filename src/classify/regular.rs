use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::labels::LabelMap;
use super::traits::{Classifier, InferenceEngine};
use super::types::{Image, Prediction, ProcessingUnit};

/// CPU/GPU classifier
pub struct RegularClassifier {
    engine: Arc<dyn InferenceEngine>,
    labels: Arc<LabelMap>,
}

impl RegularClassifier {
    pub fn new(engine: Arc<dyn InferenceEngine>, labels: Arc<LabelMap>) -> Self {
        Self { engine, labels }
    }
}

#[async_trait]
impl Classifier for RegularClassifier {
    fn processing_unit(&self) -> ProcessingUnit {
        ProcessingUnit::Regular
    }

    async fn classify(&self, image: &Image) -> Result<Prediction> {
        let candidates = self.engine.infer(image).await?;
        self.labels.decode(&candidates).ok_or_else(|| {
            anyhow!(
                "{}: no decodable candidate for {}",
                self.engine.name(),
                image.path.display()
            )
        })
    }
}

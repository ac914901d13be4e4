use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::info;

use super::labels::LabelMap;
use super::traits::{Classifier, InferenceEngine};
use super::types::{Image, Prediction, ProcessingUnit};
use crate::error::BenchError;

/// Classifier running on a remote accelerator
pub struct CloudTpuClassifier {
    engine: Arc<dyn InferenceEngine>,
    labels: Arc<LabelMap>,
    address: String,
}

impl CloudTpuClassifier {
    /// Fails with `Config` when no accelerator address is set
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        labels: Arc<LabelMap>,
        address: Option<&str>,
    ) -> crate::Result<Self> {
        let address = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| BenchError::Config("cloud TPU requires an accelerator address".to_string()))?;
        info!("using accelerator at {}", address);
        Ok(Self {
            engine,
            labels,
            address: address.to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Classifier for CloudTpuClassifier {
    fn processing_unit(&self) -> ProcessingUnit {
        ProcessingUnit::CloudTpu
    }

    async fn classify(&self, image: &Image) -> Result<Prediction> {
        let candidates = self.engine.infer(image).await?;
        self.labels.decode(&candidates).ok_or_else(|| {
            anyhow!(
                "{} via {}: no decodable candidate for {}",
                self.engine.name(),
                self.address,
                image.path.display()
            )
        })
    }
}

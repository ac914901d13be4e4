use anyhow::Result;
use async_trait::async_trait;

use super::types::{Image, Prediction, ProcessingUnit};

/// Opaque model runtime
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Engine identifier used in logs (e.g. "keras-mobilenet", "tflite-edgetpu")
    fn name(&self) -> &str;

    /// Candidate `(class_id, score)` pairs, best first
    async fn infer(&self, image: &Image) -> Result<Vec<(usize, f32)>>;
}

/// Image classifier bound to one processing unit
#[async_trait]
pub trait Classifier: Send + Sync {
    fn processing_unit(&self) -> ProcessingUnit;

    /// Top-1 prediction with a normalized label
    async fn classify(&self, image: &Image) -> Result<Prediction>;
}

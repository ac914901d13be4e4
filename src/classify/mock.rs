use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::traits::InferenceEngine;
use super::types::Image;

enum MockMode {
    /// Image bytes hold a decimal class id
    Echo,
    /// Image bytes hold a label, matched against the vocabulary
    Vocabulary(Vec<String>),
    Empty,
}

/// Deterministic engine for tests and demos
pub struct MockEngine {
    mode: MockMode,
    latency: Duration,
}

impl MockEngine {
    pub fn echo() -> Self {
        Self {
            mode: MockMode::Echo,
            latency: Duration::ZERO,
        }
    }

    /// Unknown labels yield no candidate
    pub fn vocabulary<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            mode: MockMode::Vocabulary(labels.into_iter().map(Into::into).collect()),
            latency: Duration::ZERO,
        }
    }

    pub fn empty() -> Self {
        Self {
            mode: MockMode::Empty,
            latency: Duration::ZERO,
        }
    }

    /// Simulated inference time per image
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn infer(&self, image: &Image) -> Result<Vec<(usize, f32)>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let text = std::str::from_utf8(&image.data)
            .map_err(|_| anyhow!("{} is not a mock image", image.path.display()))?
            .trim();
        match &self.mode {
            MockMode::Echo => {
                let id = text
                    .parse::<usize>()
                    .map_err(|_| anyhow!("{}: expected a class id, got {:?}", image.path.display(), text))?;
                Ok(vec![(id, 1.0)])
            }
            MockMode::Vocabulary(labels) => Ok(labels
                .iter()
                .position(|label| label.eq_ignore_ascii_case(text))
                .map(|id| vec![(id, 0.9)])
                .unwrap_or_default()),
            MockMode::Empty => Ok(Vec::new()),
        }
    }
}

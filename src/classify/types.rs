use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Hardware family a classifier runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingUnit {
    /// CPU or GPU
    #[default]
    Regular,
    CloudTpu,
    EdgeTpu,
}

impl ProcessingUnit {
    pub const ALL: [ProcessingUnit; 3] = [
        ProcessingUnit::Regular,
        ProcessingUnit::CloudTpu,
        ProcessingUnit::EdgeTpu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::CloudTpu => "cloud_tpu",
            Self::EdgeTpu => "edge_tpu",
        }
    }
}

impl fmt::Display for ProcessingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingUnit {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "regular" | "cpu" | "gpu" => Ok(Self::Regular),
            "cloud_tpu" | "tpu" => Ok(Self::CloudTpu),
            "edge_tpu" | "edgetpu" => Ok(Self::EdgeTpu),
            other => Err(BenchError::Config(format!("unknown processing unit {:?}", other))),
        }
    }
}

/// Top-1 result for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Encoded image handed to an engine untouched
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl Image {
    pub fn new(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| BenchError::io(path, e))?;
        Ok(Self::new(path, data))
    }
}

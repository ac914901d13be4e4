use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, info, warn};

use super::edge_tpu::NO_CANDIDATE_LABEL;
use super::labels::normalize_label;
use super::metrics::{ClassifierMetrics, ImageOutcome};
use super::traits::Classifier;
use super::types::Image;
use crate::channel::{Marker, Sender};
use crate::error::BenchError;
use crate::profile::PredictionLog;

/// One class directory of an image dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetClass {
    /// Normalized label
    pub name: String,
    pub dir: PathBuf,
}

/// `n02085620-Chihuahua` names the class `chihuahua`; directories without a
/// `-` use their whole name.
pub fn class_name(dir_name: &str) -> String {
    let label = dir_name
        .split_once('-')
        .map(|(_, rest)| rest)
        .unwrap_or(dir_name);
    normalize_label(label)
}

/// Sub-directories of `dataset_dir`, sorted by path
pub fn dataset_classes(dataset_dir: &Path) -> crate::Result<Vec<DatasetClass>> {
    let entries = fs::read_dir(dataset_dir).map_err(|e| BenchError::io(dataset_dir, e))?;
    let mut classes = Vec::new();
    for entry in entries {
        let dir = entry.map_err(|e| BenchError::io(dataset_dir, e))?.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        classes.push(DatasetClass {
            name: class_name(name),
            dir,
        });
    }
    classes.sort_by(|a, b| a.dir.cmp(&b.dir));
    Ok(classes)
}

fn image_files(dir: &Path) -> crate::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| BenchError::io(dir, e))? {
        let path = entry.map_err(|e| BenchError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Classify every image under `dataset_dir` and log a metrics report
pub async fn run_dataset(
    classifier: &dyn Classifier,
    dataset_dir: &Path,
    sender: Option<&mut Sender>,
) -> Result<PredictionLog> {
    let metrics = ClassifierMetrics::new(classifier.processing_unit().as_str());
    let log = run_dataset_with_metrics(classifier, dataset_dir, sender, &metrics).await?;
    info!("{}", metrics.generate_report());
    Ok(log)
}

/// Brackets the whole pass with `profile_start`/`profile_end` when a sender
/// is given. Every image gets a row; one the classifier fails on is logged
/// as `other`.
pub async fn run_dataset_with_metrics(
    classifier: &dyn Classifier,
    dataset_dir: &Path,
    mut sender: Option<&mut Sender>,
    metrics: &ClassifierMetrics,
) -> Result<PredictionLog> {
    let classes = dataset_classes(dataset_dir)?;
    let known: HashSet<&str> = classes.iter().map(|c| c.name.as_str()).collect();

    let mut work = Vec::new();
    for class in &classes {
        for path in image_files(&class.dir)? {
            work.push((class.name.as_str(), path));
        }
    }
    if work.is_empty() {
        return Err(BenchError::EmptyDataset {
            path: dataset_dir.to_path_buf(),
        }
        .into());
    }
    info!(
        "classifying {} images in {} classes on {}",
        work.len(),
        classes.len(),
        classifier.processing_unit()
    );

    if let Some(sender) = sender.as_deref_mut() {
        sender.send(&Marker::ProfileStart).await?;
    }

    let mut log = PredictionLog::new();
    for (y_true, path) in work {
        let image = Image::load(&path).await?;
        let start = Instant::now();
        let outcome = classifier.classify(&image).await;
        let latency = start.elapsed();

        match outcome {
            Ok(prediction) => {
                debug!("{} -> {} ({:.3})", path.display(), prediction.label, prediction.score);
                let hit = if prediction.label == y_true {
                    ImageOutcome::Correct
                } else {
                    ImageOutcome::Wrong
                };
                metrics.record(y_true, hit, latency);
                let is_dog = known.contains(prediction.label.as_str());
                log.push(y_true, prediction.label, Some(is_dog));
            }
            Err(e) => {
                metrics.record(y_true, ImageOutcome::Failed, latency);
                warn!("{} failed, logged as {}: {:#}", path.display(), NO_CANDIDATE_LABEL, e);
                log.push(y_true, NO_CANDIDATE_LABEL, Some(false));
            }
        }
    }

    if let Some(sender) = sender.as_deref_mut() {
        sender
            .send(&Marker::ProfileEnd)
            .await
            .context("sending profile_end")?;
    }

    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("n02085620-Chihuahua"), "chihuahua");
        assert_eq!(class_name("n02106662-German_shepherd"), "german shepherd");
        assert_eq!(class_name("n02088364-black-and-tan_coonhound"), "black-and-tan coonhound");
        assert_eq!(class_name("Beagle"), "beagle");
    }
}

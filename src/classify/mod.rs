//! Image classifiers whose passes are bracketed by the event channel.

pub mod cloud_tpu;
pub mod edge_tpu;
pub mod labels;
pub mod metrics;
pub mod mock;
pub mod registry;
pub mod regular;
pub mod runner;
pub mod traits;
pub mod types;

pub use cloud_tpu::CloudTpuClassifier;
pub use edge_tpu::EdgeTpuClassifier;
pub use labels::{normalize_label, LabelMap};
pub use metrics::{ClassTally, ClassifierMetrics, ImageOutcome, MetricsSnapshot};
pub use mock::MockEngine;
pub use registry::ClassifierRegistry;
pub use regular::RegularClassifier;
pub use runner::{class_name, dataset_classes, run_dataset, run_dataset_with_metrics, DatasetClass};
pub use traits::{Classifier, InferenceEngine};
pub use types::{Image, Prediction, ProcessingUnit};

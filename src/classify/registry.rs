use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use super::cloud_tpu::CloudTpuClassifier;
use super::edge_tpu::EdgeTpuClassifier;
use super::labels::LabelMap;
use super::regular::RegularClassifier;
use super::traits::{Classifier, InferenceEngine};
use super::types::ProcessingUnit;
use crate::config::ClassifierConfig;

type ClassifierFactory = Box<dyn Fn() -> Result<Box<dyn Classifier>> + Send + Sync>;

/// Registry of classifier constructors keyed by processing unit
pub struct ClassifierRegistry {
    factories: HashMap<ProcessingUnit, ClassifierFactory>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers all three processing units around one engine
    pub fn with_defaults(
        engine: Arc<dyn InferenceEngine>,
        labels: Arc<LabelMap>,
        config: &ClassifierConfig,
    ) -> Self {
        let mut registry = Self::new();

        let (e, l) = (engine.clone(), labels.clone());
        registry.register(ProcessingUnit::Regular, move || {
            Ok(Box::new(RegularClassifier::new(e.clone(), l.clone())) as Box<dyn Classifier>)
        });

        let (e, l) = (engine.clone(), labels.clone());
        let address = config.accelerator_address.clone();
        registry.register(ProcessingUnit::CloudTpu, move || {
            let classifier = CloudTpuClassifier::new(e.clone(), l.clone(), address.as_deref())?;
            Ok(Box::new(classifier) as Box<dyn Classifier>)
        });

        let label_file = config.label_file.clone();
        registry.register(ProcessingUnit::EdgeTpu, move || {
            let classifier = match &label_file {
                Some(path) => EdgeTpuClassifier::from_label_file(engine.clone(), path)
                    .with_context(|| format!("loading edge labels from {}", path.display()))?,
                None => EdgeTpuClassifier::new(engine.clone(), labels.clone()),
            };
            Ok(Box::new(classifier) as Box<dyn Classifier>)
        });

        registry
    }

    pub fn register<F>(&mut self, kind: ProcessingUnit, factory: F)
    where
        F: Fn() -> Result<Box<dyn Classifier>> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    pub fn create(&self, kind: ProcessingUnit) -> Result<Box<dyn Classifier>> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| anyhow!("No classifier registered for {}", kind))?;
        factory()
    }

    pub fn list_kinds(&self) -> Vec<ProcessingUnit> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

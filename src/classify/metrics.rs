use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What became of one image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Correct,
    Wrong,
    /// The classifier returned an error
    Failed,
}

/// Counts for one ground-truth class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTally {
    pub images: u64,
    pub correct: u64,
    pub failed: u64,
    pub latency_us: u64,
}

impl ClassTally {
    pub fn accuracy(&self) -> Option<f64> {
        (self.images > 0).then(|| self.correct as f64 / self.images as f64)
    }
}

/// Per-class image accounting for one dataset pass
pub struct ClassifierMetrics {
    name: String,
    classes: Mutex<BTreeMap<String, ClassTally>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub name: String,
    pub images: u64,
    pub correct: u64,
    pub failed: u64,
    pub avg_latency_us: u64,
    pub classes: BTreeMap<String, ClassTally>,
}

impl ClassifierMetrics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn classes(&self) -> MutexGuard<'_, BTreeMap<String, ClassTally>> {
        self.classes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count one image of class `y_true`
    pub fn record(&self, y_true: &str, outcome: ImageOutcome, latency: Duration) {
        let mut classes = self.classes();
        let tally = classes.entry(y_true.to_string()).or_default();
        tally.images += 1;
        tally.latency_us += latency.as_micros() as u64;
        match outcome {
            ImageOutcome::Correct => tally.correct += 1,
            ImageOutcome::Wrong => {}
            ImageOutcome::Failed => tally.failed += 1,
        }
    }

    pub fn class(&self, y_true: &str) -> Option<ClassTally> {
        self.classes().get(y_true).cloned()
    }

    /// Every image seen, failed ones included
    pub fn images_processed(&self) -> u64 {
        self.classes().values().map(|t| t.images).sum()
    }

    pub fn errors_count(&self) -> u64 {
        self.classes().values().map(|t| t.failed).sum()
    }

    pub fn correct_count(&self) -> u64 {
        self.classes().values().map(|t| t.correct).sum()
    }

    pub fn avg_latency_us(&self) -> u64 {
        let classes = self.classes();
        let images: u64 = classes.values().map(|t| t.images).sum();
        if images == 0 {
            return 0;
        }
        classes.values().map(|t| t.latency_us).sum::<u64>() / images
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let classes = self.classes().clone();
        let images: u64 = classes.values().map(|t| t.images).sum();
        let latency: u64 = classes.values().map(|t| t.latency_us).sum();
        MetricsSnapshot {
            name: self.name.clone(),
            images,
            correct: classes.values().map(|t| t.correct).sum(),
            failed: classes.values().map(|t| t.failed).sum(),
            avg_latency_us: if images == 0 { 0 } else { latency / images },
            classes,
        }
    }

    /// Totals line followed by one line per class, worst accuracy first
    pub fn generate_report(&self) -> String {
        let snapshot = self.snapshot();
        let mut report = format!(
            "[{}] {}/{} correct, {} failed, avg {}μs per image",
            snapshot.name, snapshot.correct, snapshot.images, snapshot.failed, snapshot.avg_latency_us
        );

        let mut classes: Vec<_> = snapshot.classes.iter().collect();
        classes.sort_by(|a, b| {
            let (acc_a, acc_b) = (a.1.accuracy().unwrap_or(0.0), b.1.accuracy().unwrap_or(0.0));
            acc_a.total_cmp(&acc_b).then_with(|| a.0.cmp(b.0))
        });
        for (class, tally) in classes {
            report.push_str(&format!(
                "\n  {:<24} {:>4}/{:<4} correct",
                class, tally.correct, tally.images
            ));
            if tally.failed > 0 {
                report.push_str(&format!(", {} failed", tally.failed));
            }
        }
        report
    }
}

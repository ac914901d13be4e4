use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::types::Prediction;
use crate::error::{BenchError, Result};

/// Trim, `_` to space, lowercase
pub fn normalize_label(raw: &str) -> String {
    raw.trim().replace('_', " ").to_lowercase()
}

/// Class id to normalized label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    labels: BTreeMap<usize, String>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: usize, label: &str) {
        self.labels.insert(id, normalize_label(label));
    }

    /// One label per line, the line index being the class id
    pub fn from_lines(text: &str) -> Self {
        let mut map = Self::new();
        for (id, line) in text.lines().enumerate() {
            if !line.trim().is_empty() {
                map.insert(id, line);
            }
        }
        map
    }

    /// Accelerator label file: `NNNN label, synonyms` per line. Only the
    /// text before the first comma is kept.
    pub fn parse_indexed(text: &str, origin: &Path) -> Result<Self> {
        let mut map = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (id, rest) = line
                .split_once(char::is_whitespace)
                .ok_or_else(|| BenchError::format(origin, format!("line {}: no label after id", idx + 1)))?;
            let id = id.parse::<usize>().map_err(|_| {
                BenchError::format(origin, format!("line {}: bad class id {:?}", idx + 1, id))
            })?;
            let label = rest.split(',').next().unwrap_or_default();
            map.insert(id, label);
        }
        Ok(map)
    }

    /// Indexed format when the first line starts with a number, plain otherwise
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        if looks_indexed(&text) {
            Self::parse_indexed(&text, path)
        } else {
            Ok(Self::from_lines(&text))
        }
    }

    pub fn get(&self, id: usize) -> Option<&str> {
        self.labels.get(&id).map(String::as_str)
    }

    pub fn contains_label(&self, label: &str) -> bool {
        let label = normalize_label(label);
        self.labels.values().any(|l| *l == label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Decode the best candidate; `None` when there is none or its id is unknown
    pub fn decode(&self, candidates: &[(usize, f32)]) -> Option<Prediction> {
        let &(id, score) = candidates.first()?;
        self.get(id).map(|label| Prediction::new(label, score))
    }
}

impl<S: AsRef<str>> FromIterator<S> for LabelMap {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut map = Self::new();
        for (id, label) in iter.into_iter().enumerate() {
            map.insert(id, label.as_ref());
        }
        map
    }
}

fn looks_indexed(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.split_whitespace().next())
        .is_some_and(|first| first.chars().all(|c| c.is_ascii_digit()))
}

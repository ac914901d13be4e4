use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// One classified image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub y_true: String,
    pub y_pred: String,
    /// Prediction named any class of the reference set
    pub y_pred_dog: Option<bool>,
}

/// Per-image prediction log written next to each profiling report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionLog {
    pub rows: Vec<PredictionRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Accuracy {
    /// Exact label matches over all rows
    pub accuracy: f64,
    /// Mean of the reference-set flag, when the log carries it
    pub breed_accuracy: Option<f64>,
    pub rows: usize,
}

impl PredictionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, y_true: impl Into<String>, y_pred: impl Into<String>, y_pred_dog: Option<bool>) {
        self.rows.push(PredictionRow {
            y_true: y_true.into(),
            y_pred: y_pred.into(),
            y_pred_dog,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `None` for an empty log
    pub fn accuracy(&self) -> Option<Accuracy> {
        if self.rows.is_empty() {
            return None;
        }
        let n = self.rows.len() as f64;
        let correct = self.rows.iter().filter(|r| r.y_pred == r.y_true).count();
        let has_flag = self.rows.iter().any(|r| r.y_pred_dog.is_some());
        let flagged = self
            .rows
            .iter()
            .filter(|r| r.y_pred_dog == Some(true))
            .count();

        Some(Accuracy {
            accuracy: correct as f64 / n,
            breed_accuracy: has_flag.then(|| flagged as f64 / n),
            rows: self.rows.len(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        Self::parse(&text, path)
    }

    /// Comma separated with a header naming `y_true`, `y_pred` and optionally
    /// `y_pred_dog`. Other columns, including an unnamed index, are ignored.
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let fail = |message: String| BenchError::format(origin, message);
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| fail("missing header row".to_string()))?;
        let columns = split_record(header);
        let column = |name: &str| columns.iter().position(|c| c == name);
        let true_idx = column("y_true").ok_or_else(|| fail("no y_true column".to_string()))?;
        let pred_idx = column("y_pred").ok_or_else(|| fail("no y_pred column".to_string()))?;
        let dog_idx = column("y_pred_dog");

        let mut log = Self::new();
        for (idx, line) in lines {
            let cells = split_record(line);
            let cell = |i: usize| {
                cells.get(i).cloned().ok_or_else(|| {
                    fail(format!("line {}: expected {} columns", idx + 1, columns.len()))
                })
            };
            let y_pred_dog = match dog_idx {
                Some(i) => Some(parse_flag(&cell(i)?).ok_or_else(|| {
                    fail(format!("line {}: bad y_pred_dog {:?}", idx + 1, cells[i]))
                })?),
                None => None,
            };
            log.push(cell(true_idx)?, cell(pred_idx)?, y_pred_dog);
        }
        Ok(log)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut out = String::from("y_true,y_pred,y_pred_dog\n");
        for row in &self.rows {
            let flag = match row.y_pred_dog {
                Some(true) => "1",
                Some(false) => "0",
                None => "",
            };
            out.push_str(&format!("{},{},{}\n", esc(&row.y_true), esc(&row.y_pred), flag));
        }
        fs::write(path, out).map_err(|e| BenchError::io(path, e))
    }
}

/// Accuracy of the log at `path`; an empty log is `EmptyDataset`
pub fn load_accuracy(path: &Path) -> Result<Accuracy> {
    PredictionLog::load(path)?
        .accuracy()
        .ok_or_else(|| BenchError::EmptyDataset {
            path: path.to_path_buf(),
        })
}

/// Empty cells count as `false`
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" => Some(true),
        "0" | "0.0" | "false" | "" => Some(false),
        _ => None,
    }
}

pub(crate) fn esc(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Split one CSV record, honoring double-quoted fields
fn split_record(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

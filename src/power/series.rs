use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock;
use crate::error::{BenchError, Result};

/// JSON preamble on the first line of a power log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesMetadata {
    pub delimiter: String,
    #[serde(alias = "comment_marker")]
    pub comment: String,
    /// Name of the timestamp column
    pub time_format: String,
    /// Any other keys the logger wrote (device, units, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One power meter reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerSample {
    pub timestamp: NaiveDateTime,
    pub voltage: f64,
    pub current: f64,
}

impl PowerSample {
    pub fn new(timestamp: NaiveDateTime, voltage: f64, current: f64) -> Self {
        Self {
            timestamp,
            voltage,
            current,
        }
    }

    pub fn watts(&self) -> f64 {
        self.voltage * self.current
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerSeries {
    pub metadata: SeriesMetadata,
    /// In file order; callers sort if the meter wrote out of order
    pub samples: Vec<PowerSample>,
}

pub fn load_series(path: &Path) -> Result<PowerSeries> {
    let text = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    parse_series(&text, path)
}

/// Parse power log text; `origin` names the file in errors
pub fn parse_series(text: &str, origin: &Path) -> Result<PowerSeries> {
    let fail = |message: String| BenchError::format(origin, message);
    let mut lines = text.lines().enumerate();

    let (_, first) = lines
        .next()
        .ok_or_else(|| fail("empty file, missing JSON preamble".to_string()))?;
    let preamble = first.trim().strip_prefix('#').map(str::trim).ok_or_else(|| {
        fail("first line is not a `# {...}` JSON preamble".to_string())
    })?;
    let metadata: SeriesMetadata = serde_json::from_str(preamble)
        .map_err(|e| fail(format!("malformed JSON preamble: {}", e)))?;
    if metadata.delimiter.is_empty() {
        return Err(fail("preamble delimiter is empty".to_string()));
    }

    let delimiter = metadata.delimiter.as_str();
    let comment = metadata.comment.as_str();
    let mut content = lines
        .map(|(idx, line)| (idx + 1, strip_comment(line, comment)))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = content
        .next()
        .ok_or_else(|| fail("no header row after preamble".to_string()))?;
    let columns: Vec<String> = split_cells(header, delimiter).map(str::to_string).collect();
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| fail(format!("no column {:?} in header {:?}", name, columns)))
    };
    let time_idx = column(&metadata.time_format)?;
    let voltage_idx = column("voltage")?;
    let current_idx = column("current")?;

    let mut samples = Vec::new();
    for (line_no, line) in content {
        let cells: Vec<&str> = split_cells(line, delimiter).collect();
        let cell = |idx: usize| {
            cells.get(idx).copied().ok_or_else(|| {
                fail(format!(
                    "line {}: expected {} columns, found {}",
                    line_no,
                    columns.len(),
                    cells.len()
                ))
            })
        };

        let raw_ts = cell(time_idx)?;
        let timestamp = clock::parse_timestamp(raw_ts)
            .ok_or_else(|| fail(format!("line {}: bad timestamp {:?}", line_no, raw_ts)))?;
        let number = |idx: usize, name: &str| -> Result<f64> {
            let raw = cell(idx)?;
            raw.parse::<f64>()
                .map_err(|_| fail(format!("line {}: bad {} {:?}", line_no, name, raw)))
        };

        samples.push(PowerSample::new(
            timestamp,
            number(voltage_idx, "voltage")?,
            number(current_idx, "current")?,
        ));
    }

    Ok(PowerSeries { metadata, samples })
}

fn strip_comment<'a>(line: &'a str, comment: &str) -> &'a str {
    if comment.is_empty() {
        return line;
    }
    match line.find(comment) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn split_cells<'a>(line: &'a str, delimiter: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    line.split(delimiter).map(|cell| cell.trim().trim_matches('"'))
}

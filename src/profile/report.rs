use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Token on the header line that starts the tabular section
const HEADER_TOKEN: &str = "ncalls";
const COLUMNS: usize = 6;

/// One line of a call-profile report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// Total calls; for `total/primitive` pairs only the first number is kept
    pub call_count: u64,
    pub total_time: f64,
    pub per_call_time: f64,
    pub cumulative_time: f64,
    pub per_call_cumulative_time: f64,
    /// `filename:lineno(function)`
    pub source_location: String,
}

/// Parsed report, rows sorted by cumulative time descending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub total_seconds: f64,
    pub rows: Vec<ProfileRow>,
}

impl ProfileReport {
    pub fn parse(text: &str, origin: &Path) -> Result<Self> {
        let rows = parse_rows(text, origin)?;
        let total_seconds = summary_seconds(text)
            .unwrap_or_else(|| rows.iter().map(|row| row.total_time).sum());
        Ok(Self {
            total_seconds,
            rows,
        })
    }

    pub fn total_minutes(&self) -> f64 {
        self.total_seconds / 60.0
    }

    pub fn lookup(&self, source_location: &str) -> Result<f64> {
        lookup(&self.rows, source_location)
    }
}

pub fn load_report(path: &Path) -> Result<ProfileReport> {
    let text = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
    ProfileReport::parse(&text, path)
}

/// Parse the tabular section of a report held in memory
pub fn parse(report_text: &str) -> Result<Vec<ProfileRow>> {
    parse_rows(report_text, Path::new("<report>"))
}

/// Everything before the `ncalls` header is discarded. Output is stable
/// sorted by cumulative time, descending.
pub fn parse_rows(text: &str, origin: &Path) -> Result<Vec<ProfileRow>> {
    let mut lines = text.lines().enumerate();
    if !lines.any(|(_, line)| line.contains(HEADER_TOKEN)) {
        return Err(BenchError::format(
            origin,
            format!("no `{}` header line", HEADER_TOKEN),
        ));
    }

    let mut rows = lines
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_row(line).map_err(|msg| {
            BenchError::format(origin, format!("line {}: {}", idx + 1, msg))
        }))
        .collect::<Result<Vec<_>>>()?;

    rows.sort_by(|a, b| b.cumulative_time.total_cmp(&a.cumulative_time));
    Ok(rows)
}

fn parse_row(line: &str) -> std::result::Result<ProfileRow, String> {
    let fields = split_columns(line);
    if fields.len() != COLUMNS {
        return Err(format!("expected {} columns, found {}", COLUMNS, fields.len()));
    }

    let calls = fields[0].split('/').next().unwrap_or_default();
    let call_count = calls
        .parse::<u64>()
        .map_err(|_| format!("bad call count {:?}", fields[0]))?;
    let number = |idx: usize| {
        fields[idx]
            .parse::<f64>()
            .map_err(|_| format!("bad number {:?}", fields[idx]))
    };

    Ok(ProfileRow {
        call_count,
        total_time: number(1)?,
        per_call_time: number(2)?,
        cumulative_time: number(3)?,
        per_call_cumulative_time: number(4)?,
        source_location: fields[5].to_string(),
    })
}

/// Split on whitespace into at most six fields; the last keeps its
/// internal spaces (`{built-in method builtins.exec}`).
fn split_columns(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(COLUMNS);
    let mut rest = line.trim();
    while fields.len() < COLUMNS - 1 && !rest.is_empty() {
        match rest.find(char::is_whitespace) {
            Some(pos) => {
                fields.push(&rest[..pos]);
                rest = rest[pos..].trim_start();
            }
            None => {
                fields.push(rest);
                rest = "";
            }
        }
    }
    if !rest.is_empty() {
        fields.push(rest);
    }
    fields
}

/// Seconds from the `N function calls (...) in X seconds` summary line
fn summary_seconds(text: &str) -> Option<f64> {
    text.lines()
        .take_while(|line| !line.contains(HEADER_TOKEN))
        .filter(|line| line.contains("function calls"))
        .find_map(|line| {
            let before = line.trim().strip_suffix("seconds")?;
            let (_, value) = before.rsplit_once(" in ")?;
            value.trim().parse().ok()
        })
}

/// Cumulative time of the first row whose location matches exactly
pub fn lookup(rows: &[ProfileRow], source_location: &str) -> Result<f64> {
    rows.iter()
        .find(|row| row.source_location == source_location)
        .map(|row| row.cumulative_time)
        .ok_or_else(|| BenchError::NotFound(source_location.to_string()))
}

use std::fs;
use std::path::Path;

use super::{Compilation, RunRecord};
use crate::error::{BenchError, Result};
use crate::profile::predictions::esc;

const HEADER: &str = "platform,processing_unit,processing_unit_type,model_version,run_id,\
accuracy,dog_accuracy,images,total_profile_minutes,power_secs,watt_hours,\
watts_mean,watts_max,watts_min,watts_mean_idle";

fn opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per record, in the order given
pub fn write_table_csv(path: &Path, records: &[RunRecord]) -> Result<()> {
    let mut out = String::from(HEADER);
    out.push('\n');
    for r in records {
        let id = &r.identity;
        let e = &r.energy;
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            esc(&id.platform),
            esc(&id.processing_unit),
            esc(&id.processing_unit_type),
            esc(&id.model_version),
            esc(&id.run_id),
            r.accuracy,
            opt(r.dog_accuracy),
            r.images,
            r.total_profile_minutes,
            e.duration_secs,
            e.watt_hours,
            e.mean_watts_in,
            e.max_watts_in,
            e.min_watts_in,
            opt(e.mean_watts_idle),
        ));
    }
    fs::write(path, out).map_err(|e| BenchError::io(path, e))
}

/// Records and exclusions as pretty JSON
pub fn write_json(path: &Path, compilation: &Compilation) -> Result<()> {
    let json = serde_json::to_string_pretty(compilation)
        .map_err(|e| BenchError::format(path, e.to_string()))?;
    fs::write(path, json).map_err(|e| BenchError::io(path, e))
}

/// Human-readable summary for the terminal
pub fn render_report(compilation: &Compilation) -> String {
    if compilation.is_empty() {
        return "No runs found".to_string();
    }

    let mut report = String::from("=== Compiled Runs ===\n");
    for r in &compilation.records {
        report.push_str(&format!(
            "\n[{}]\n  Accuracy: {:.3}{}\n  Profile: {:.2} min\n  Energy: {:.6} Wh over {:.1}s ({:.2} W mean)\n",
            r.identity,
            r.accuracy,
            r.dog_accuracy
                .map(|d| format!(" ({:.3} dog)", d))
                .unwrap_or_default(),
            r.total_profile_minutes,
            r.energy.watt_hours,
            r.energy.duration_secs,
            r.energy.mean_watts_in,
        ));
    }

    if !compilation.excluded.is_empty() {
        report.push_str(&format!(
            "\n{} excluded run{}:\n",
            compilation.excluded.len(),
            if compilation.excluded.len() == 1 { "" } else { "s" }
        ));
        for excluded in &compilation.excluded {
            report.push_str(&format!("  {}\n", excluded));
        }
    }

    report
}

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::naming::{split_file_name, ArtifactKind, RunIdentity};
use crate::error::{BenchError, Result};
use crate::power::{analyze_run, EnergyResult};
use crate::profile::{load_accuracy, load_report};

/// One fully joined experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(flatten)]
    pub identity: RunIdentity,
    pub accuracy: f64,
    pub dog_accuracy: Option<f64>,
    pub images: usize,
    pub total_profile_minutes: f64,
    pub energy: EnergyResult,
}

/// A run left out of the table and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedRun {
    pub prefix: String,
    pub run_id: Option<String>,
    pub file: Option<PathBuf>,
    pub reason: String,
}

impl fmt::Display for ExcludedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix)?;
        if let Some(run_id) = &self.run_id {
            write!(f, " (run {})", run_id)?;
        }
        if let Some(file) = &self.file {
            write!(f, " [{}]", file.display())?;
        }
        write!(f, ": {}", self.reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Compilation {
    pub records: Vec<RunRecord>,
    pub excluded: Vec<ExcludedRun>,
}

impl Compilation {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.excluded.is_empty()
    }
}

#[derive(Default)]
struct RunArtifacts {
    files: BTreeMap<ArtifactKind, Vec<PathBuf>>,
}

impl RunArtifacts {
    fn single(&self, kind: ArtifactKind) -> std::result::Result<&Path, String> {
        match self.files.get(&kind).map(Vec::as_slice).unwrap_or_default() {
            [path] => Ok(path.as_path()),
            [] => Err(format!("missing {} file", kind.label())),
            many => Err(format!("{} {} files, expected one", many.len(), kind.label())),
        }
    }
}

/// Group artifact files by run prefix and join each complete group into a
/// record. Files that do not follow the `<prefix> - <suffix>` naming are
/// ignored; incomplete or unreadable runs land in `excluded`.
pub fn compile(files: &[PathBuf]) -> Compilation {
    let mut groups: BTreeMap<String, RunArtifacts> = BTreeMap::new();
    for path in files {
        match split_file_name(path) {
            Some((prefix, kind)) => groups
                .entry(prefix)
                .or_default()
                .files
                .entry(kind)
                .or_default()
                .push(path.clone()),
            None => debug!("skipping {}: not a run artifact", path.display()),
        }
    }

    let mut compilation = Compilation::default();
    for (prefix, artifacts) in groups {
        match compile_run(&prefix, &artifacts) {
            Ok(record) => {
                info!(
                    "compiled run {}: accuracy {:.3}, {:.6} Wh",
                    prefix, record.accuracy, record.energy.watt_hours
                );
                compilation.records.push(record);
            }
            Err(excluded) => {
                warn!("excluding {}", excluded);
                compilation.excluded.push(excluded);
            }
        }
    }

    compilation
        .records
        .sort_by_key(|r| (r.identity.run_id.clone(), r.identity.prefix()));
    compilation
}

/// Compile every file directly inside `dir`
pub fn compile_dir(dir: &Path) -> Result<Compilation> {
    let entries = fs::read_dir(dir).map_err(|e| BenchError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| BenchError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(compile(&files))
}

fn compile_run(prefix: &str, artifacts: &RunArtifacts) -> std::result::Result<RunRecord, ExcludedRun> {
    let exclude = |run_id: Option<&str>, file: Option<&Path>, reason: String| ExcludedRun {
        prefix: prefix.to_string(),
        run_id: run_id.map(str::to_string),
        file: file.map(Path::to_path_buf),
        reason,
    };

    let identity = RunIdentity::parse(prefix).ok_or_else(|| {
        exclude(
            None,
            None,
            "name is not <platform>_<pu>_<pu_type>_<model_version>_<run_id>".to_string(),
        )
    })?;
    let run_id = Some(identity.run_id.as_str());

    let pick = |kind| artifacts.single(kind).map_err(|reason| exclude(run_id, None, reason));
    let power = pick(ArtifactKind::Power)?;
    let timing = pick(ArtifactKind::Timing)?;
    let report = pick(ArtifactKind::Report)?;
    let predictions = pick(ArtifactKind::Predictions)?;

    let fault = |file: &Path, err: BenchError| {
        let file = match &err {
            BenchError::Format { path, .. }
            | BenchError::Io { path, .. }
            | BenchError::EmptyDataset { path } => path.clone(),
            _ => file.to_path_buf(),
        };
        exclude(run_id, Some(file.as_path()), format!("{}: {}", err.kind(), err))
    };

    let energy = analyze_run(power, timing).map_err(|e| fault(power, e))?;
    let profile = load_report(report).map_err(|e| fault(report, e))?;
    let accuracy = load_accuracy(predictions).map_err(|e| fault(predictions, e))?;

    Ok(RunRecord {
        identity,
        accuracy: accuracy.accuracy,
        dog_accuracy: accuracy.breed_accuracy,
        images: accuracy.rows,
        total_profile_minutes: profile.total_minutes(),
        energy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const POWER: &str = "#{\"delimiter\": \",\", \"comment\": \";\", \"time_format\": \"timestamp\"}\n\
                         timestamp,voltage,current\n\
                         100.0,5.0,2.0\n\
                         101.0,5.0,2.0\n\
                         102.0,5.0,4.0\n\
                         103.0,5.0,1.0\n";
    const TIMING: &str = "100.5,profile_start\n102.5,profile_end\n";
    const REPORT: &str = "   30 function calls in 90.0 seconds\n\n\
                          ncalls tottime percall cumtime percall filename:lineno(function)\n\
                          1 90.0 90.0 90.0 90.0 run.py:1(main)\n";
    const PREDICTIONS: &str = "y_true,y_pred,y_pred_dog\npug,pug,1\npug,bagel,0\n";

    fn write_run(dir: &Path, prefix: &str, skip: Option<ArtifactKind>) {
        let id = RunIdentity::parse(prefix).unwrap();
        for (kind, body) in [
            (ArtifactKind::Power, POWER),
            (ArtifactKind::Timing, TIMING),
            (ArtifactKind::Report, REPORT),
            (ArtifactKind::Predictions, PREDICTIONS),
        ] {
            if Some(kind) != skip {
                fs::write(dir.join(id.file_name(kind)), body).unwrap();
            }
        }
    }

    #[test]
    fn test_complete_run_joined() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "laptop_cpu_i7_tf1.13_1", None);

        let compilation = compile_dir(dir.path()).unwrap();
        assert!(compilation.excluded.is_empty());
        let record = &compilation.records[0];
        assert_eq!(record.identity.platform, "laptop");
        assert_eq!(record.accuracy, 0.5);
        assert_eq!(record.dog_accuracy, Some(0.5));
        assert_eq!(record.images, 2);
        assert_eq!(record.total_profile_minutes, 1.5);
        assert_eq!(record.energy.samples_in, 2);
        // 10 W over the second, 20 W over the third
        assert!((record.energy.watt_hours - 30.0 / 3600.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_report_excludes_only_that_run() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "laptop_cpu_i7_tf1.13_2", None);
        write_run(dir.path(), "laptop_cpu_i7_tf1.13_1", Some(ArtifactKind::Report));

        let compilation = compile_dir(dir.path()).unwrap();
        assert_eq!(compilation.records.len(), 1);
        assert_eq!(compilation.records[0].identity.run_id, "2");
        assert_eq!(compilation.excluded.len(), 1);
        let excluded = &compilation.excluded[0];
        assert_eq!(excluded.run_id.as_deref(), Some("1"));
        assert!(excluded.reason.contains("profiling report"));
    }

    #[test]
    fn test_duplicate_artifact_excluded() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "rpi_cpu_arm_tf1.13_1", None);
        fs::write(
            dir.path().join("rpi_cpu_arm_tf1.13_1 - power_retry.csv"),
            POWER,
        )
        .unwrap();

        let compilation = compile_dir(dir.path()).unwrap();
        assert!(compilation.records.is_empty());
        assert!(compilation.excluded[0].reason.contains("2 power files"));
    }

    #[test]
    fn test_bad_prediction_log_names_file() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "rpi_cpu_arm_tf1.13_1", None);
        let bad = dir.path().join("rpi_cpu_arm_tf1.13_1 - predictions.csv");
        fs::write(&bad, "y_true,y_pred\n").unwrap();

        let compilation = compile_dir(dir.path()).unwrap();
        let excluded = &compilation.excluded[0];
        assert_eq!(excluded.file.as_deref(), Some(bad.as_path()));
        assert!(excluded.reason.starts_with("empty-dataset"));
    }

    #[test]
    fn test_unparseable_identity() {
        let compilation = compile(&[PathBuf::from("short_name - power.csv")]);
        assert!(compilation.records.is_empty());
        assert_eq!(compilation.excluded[0].run_id, None);
    }

    #[test]
    fn test_records_ordered_by_run_id() {
        let dir = tempdir().unwrap();
        write_run(dir.path(), "b_cpu_x_tf1_2", None);
        write_run(dir.path(), "a_cpu_x_tf1_2", None);
        write_run(dir.path(), "z_cpu_x_tf1_1", None);

        let compilation = compile_dir(dir.path()).unwrap();
        let order: Vec<_> = compilation.records.iter().map(|r| r.identity.prefix()).collect();
        assert_eq!(order, ["z_cpu_x_tf1_1", "a_cpu_x_tf1_2", "b_cpu_x_tf1_2"]);
    }
}

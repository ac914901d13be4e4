use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Separator between a run prefix and the artifact suffix
pub const SUFFIX_SEPARATOR: &str = " - ";

/// Fields shared by every artifact of one experiment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunIdentity {
    pub platform: String,
    pub processing_unit: String,
    pub processing_unit_type: String,
    pub model_version: String,
    pub run_id: String,
}

impl RunIdentity {
    /// `<platform>_<pu>_<pu_type>_<model_version>_<run_id>`; the run id keeps
    /// any further underscores.
    pub fn parse(prefix: &str) -> Option<Self> {
        let mut parts = prefix.splitn(5, '_').map(str::trim);
        let mut next = || parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        Some(Self {
            platform: next()?,
            processing_unit: next()?,
            processing_unit_type: next()?,
            model_version: next()?,
            run_id: next()?,
        })
    }

    pub fn prefix(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.platform,
            self.processing_unit,
            self.processing_unit_type,
            self.model_version,
            self.run_id
        )
    }

    /// File name for one artifact of this run
    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!("{}{}{}", self.prefix(), SUFFIX_SEPARATOR, kind.default_suffix())
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix())
    }
}

/// The four files a complete run leaves behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Power meter log
    Power,
    /// Receiver run log with the window markers
    Timing,
    /// Call-profile report
    Report,
    Predictions,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Power,
        ArtifactKind::Timing,
        ArtifactKind::Report,
        ArtifactKind::Predictions,
    ];

    pub fn classify(suffix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| suffix.contains(kind.keyword()))
    }

    fn keyword(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Timing => "profile_output",
            Self::Report => "pstats",
            Self::Predictions => "predictions",
        }
    }

    pub fn default_suffix(&self) -> &'static str {
        match self {
            Self::Power => "power.csv",
            Self::Timing => "profile_output.txt",
            Self::Report => "pstats.txt",
            Self::Predictions => "predictions.csv",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Timing => "timing",
            Self::Report => "profiling report",
            Self::Predictions => "prediction log",
        }
    }
}

/// Split a file name into run prefix and artifact kind
pub fn split_file_name(path: &Path) -> Option<(String, ArtifactKind)> {
    let name = path.file_name()?.to_str()?;
    let (prefix, suffix) = name.split_once(SUFFIX_SEPARATOR)?;
    Some((prefix.to_string(), ArtifactKind::classify(suffix)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity() {
        let id = RunIdentity::parse("rpi3_edgetpu_usb_tf1.13_run_07").unwrap();
        assert_eq!(id.platform, "rpi3");
        assert_eq!(id.processing_unit, "edgetpu");
        assert_eq!(id.processing_unit_type, "usb");
        assert_eq!(id.model_version, "tf1.13");
        assert_eq!(id.run_id, "run_07");
        assert_eq!(id.prefix(), "rpi3_edgetpu_usb_tf1.13_run_07");
    }

    #[test]
    fn test_short_prefix_rejected() {
        assert_eq!(RunIdentity::parse("laptop_cpu_x86"), None);
        assert_eq!(RunIdentity::parse("laptop_cpu__tf1.13_1"), None);
    }

    #[test]
    fn test_split_file_name() {
        let path = Path::new("data/colab_tpu_v2_tf1.13_3 - pstats.txt");
        assert_eq!(
            split_file_name(path),
            Some(("colab_tpu_v2_tf1.13_3".to_string(), ArtifactKind::Report))
        );
        assert_eq!(
            split_file_name(Path::new("x_y_z_w_1 - profile_output.txt")),
            Some(("x_y_z_w_1".to_string(), ArtifactKind::Timing))
        );
        assert_eq!(split_file_name(Path::new("notes.txt")), None);
        assert_eq!(split_file_name(Path::new("x_y_z_w_1 - readme.md")), None);
    }

    #[test]
    fn test_file_name_matches_classification() {
        let id = RunIdentity::parse("laptop_cpu_i7_tf1.13_1").unwrap();
        for kind in ArtifactKind::ALL {
            let name = id.file_name(kind);
            assert_eq!(split_file_name(Path::new(&name)), Some((id.prefix(), kind)));
        }
    }
}

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::ProcessingUnit;
use crate::compile::{ArtifactKind, RunIdentity};
use crate::error::{BenchError, Result};

/// Process-wide configuration, loaded once and passed by reference
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    pub channel: ChannelConfig,
    pub paths: PathsConfig,
    pub classifier: ClassifierConfig,
}

/// How marker boundaries are recovered from the byte stream
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One marker per socket read, no delimiter on the wire
    #[default]
    PerRead,
    /// Markers terminated by `\n`, split and reassembled by the receiver
    Newline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    pub host: String,
    pub port: u16,
    pub buffer_size: usize,
    /// `None` blocks forever on a silent sender
    pub read_timeout_ms: Option<u64>,
    pub framing: Framing,
    /// Stop the receive loop at the first end-class marker
    pub stop_on_end: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5005,
            buffer_size: 1024,
            read_timeout_ms: None,
            framing: Framing::PerRead,
            stop_on_end: true,
        }
    }
}

impl ChannelConfig {
    /// Resolve `host:port`, taking the first address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let invalid = |reason: String| {
            BenchError::Config(format!("invalid address {}:{}: {}", self.host, self.port, reason))
        };
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("no addresses resolved".to_string()))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Power, timing, report and prediction files for compilation
    pub data_dir: PathBuf,
    /// Model and label files
    pub download_dir: PathBuf,
    /// Receiver run log, relative paths resolve against `data_dir`
    pub run_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            download_dir: PathBuf::from("downloads"),
            run_log: PathBuf::from("profile_output.txt"),
        }
    }
}

impl PathsConfig {
    pub fn run_log_path(&self) -> PathBuf {
        if self.run_log.is_absolute() {
            self.run_log.clone()
        } else {
            self.data_dir.join(&self.run_log)
        }
    }

    /// `<data_dir>/<prefix> - profile_output.txt`, named so compilation
    /// picks it up as the run's timing file
    pub fn run_log_for(&self, prefix: &str) -> Result<PathBuf> {
        let run = RunIdentity::parse(prefix).ok_or_else(|| {
            BenchError::Config(format!(
                "run prefix {:?} is not <platform>_<pu>_<pu_type>_<model>_<run_id>",
                prefix
            ))
        })?;
        Ok(self.data_dir.join(run.file_name(ArtifactKind::Timing)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ProcessingUnit,
    /// Defaults to `<download_dir>/imagenet_labels.txt`
    pub label_file: Option<PathBuf>,
    /// Cloud accelerator endpoint, e.g. `grpc://10.0.0.2:8470`
    pub accelerator_address: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ProcessingUnit::Regular,
            label_file: None,
            accelerator_address: None,
        }
    }
}

impl BenchConfig {
    /// Load configuration from a JSON file; absent fields take defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        let config: BenchConfig = serde_json::from_str(&json)
            .map_err(|e| BenchError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BenchError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, json).map_err(|e| BenchError::io(path, e))
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel.buffer_size == 0 {
            return Err(BenchError::Config("buffer_size must be non-zero".to_string()));
        }
        self.channel.socket_addr()?;
        Ok(())
    }

    pub fn label_file(&self) -> PathBuf {
        self.classifier
            .label_file
            .clone()
            .unwrap_or_else(|| self.paths.download_dir.join("imagenet_labels.txt"))
    }
}

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

/// ffprobe `-show_streams` output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FFProbeData {
    #[serde(default)]
    pub streams: Vec<FFProbeStream>,
}

/// Stream-level metadata from ffprobe
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FFProbeStream {
    #[serde(default)]
    pub index: i32,
    #[serde(rename = "codec_type")]
    pub codec_type: Option<String>,
    #[serde(rename = "codec_name")]
    pub codec_name: Option<String>,
    /// Sexagesimal (`H:MM:SS.ffffff`) when probed with `-sexagesimal`
    pub duration: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub tags: Option<HashMap<String, String>>,
    #[serde(rename = "side_data_list")]
    pub side_data_list: Option<Vec<FFProbeSideData>>,
}

/// One entry of a stream's `side_data_list`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FFProbeSideData {
    #[serde(rename = "side_data_type")]
    pub side_data_type: Option<String>,
    pub rotation: Option<i64>,
}

impl FFProbeStream {
    pub fn is_video(&self) -> bool {
        self.codec_type.as_deref() == Some("video")
    }

    pub fn is_audio(&self) -> bool {
        self.codec_type.as_deref() == Some("audio")
    }
}

/// Why a probe produced no usable record
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe tool not found: {bin}")]
    Unavailable {
        bin: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ffprobe exited with code {code} for {path}: {stderr}")]
    Failed {
        path: PathBuf,
        code: i32,
        stderr: String,
    },
    #[error("failed to run ffprobe: {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode ffprobe output: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The probe collaborator: one call per file, no retries
#[async_trait]
pub trait Prober: Send + Sync {
    /// Inspect `path` and return its stream metadata
    async fn probe(&self, path: &Path) -> Result<FFProbeData, ProbeError>;

    /// Check that the probe tool can be executed at all
    async fn check_available(&self) -> Result<(), ProbeError>;
}

/// Runs a local ffprobe binary
#[derive(Debug, Clone)]
pub struct FfprobeCommand {
    bin: PathBuf,
}

impl FfprobeCommand {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn spawn_error(&self, err: io::Error) -> ProbeError {
        if err.kind() == io::ErrorKind::NotFound {
            ProbeError::Unavailable {
                bin: self.bin.clone(),
                source: err,
            }
        } else {
            ProbeError::Io(err)
        }
    }
}

#[async_trait]
impl Prober for FfprobeCommand {
    async fn probe(&self, path: &Path) -> Result<FFProbeData, ProbeError> {
        debug!("ffprobe: probing {}", path.display());

        let output = Command::new(&self.bin)
            .arg("-v")
            .arg("error")
            .arg("-sexagesimal")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg(path)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: path.to_path_buf(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let data: FFProbeData = serde_json::from_slice(&output.stdout)?;
        debug!("ffprobe: {} stream(s) in {}", data.streams.len(), path.display());
        Ok(data)
    }

    async fn check_available(&self) -> Result<(), ProbeError> {
        let output = Command::new(&self.bin)
            .arg("-version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: self.bin.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

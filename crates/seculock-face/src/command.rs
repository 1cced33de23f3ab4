//! Detector and comparator backed by external helper programs.
//!
//! Face models (Haar cascades, DeepFace, FaceNet) live in Python tooling, so
//! the adapters exchange image files and JSON with a helper script:
//!
//! - detector: called with the frame path, prints
//!   `[{"x":..,"y":..,"width":..,"height":..}, ...]`
//! - comparator: called with the reference and probe paths, prints
//!   `{"verified": true|false}`
//!
//! Arguments may contain `{input}`, `{reference}` and `{probe}`
//! placeholders. A non-zero exit status is a verification error carrying the
//! helper's stderr. Child processes are killed if the caller's timeout drops
//! the future.

use crate::region::FaceRegion;
use crate::traits::{FaceComparator, FaceDetector};
use image::{ImageFormat, RgbImage};
use seculock_core::{Error, Result};
use serde::Deserialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Program and argument template of a helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HelperCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Run the helper with placeholders substituted and return its stdout.
    async fn run(&self, substitutions: &[(&str, String)]) -> Result<Vec<u8>> {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
            })
            .collect();
        debug!(program = %self.program, ?args, "running face helper");

        let output = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Verification(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(Error::Verification(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

pub(crate) fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| Error::Verification(format!("png encoding failed: {e}")))?;
    Ok(bytes)
}

async fn write_work_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Detector helper.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    command: HelperCommand,
    work_dir: PathBuf,
}

impl CommandDetector {
    pub fn new(command: HelperCommand, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            work_dir: work_dir.into(),
        }
    }
}

impl FaceDetector for CommandDetector {
    async fn detect(&mut self, frame: &RgbImage) -> Result<Vec<FaceRegion>> {
        let input = self.work_dir.join("frame.png");
        write_work_file(&input, &encode_png(frame)?).await?;

        let stdout = self
            .command
            .run(&[("{input}", input.display().to_string())])
            .await?;
        serde_json::from_slice(&stdout)
            .map_err(|e| Error::Verification(format!("unreadable detector output: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct ComparatorOutput {
    verified: bool,
}

/// Comparator helper.
#[derive(Debug, Clone)]
pub struct CommandComparator {
    command: HelperCommand,
    work_dir: PathBuf,
}

impl CommandComparator {
    pub fn new(command: HelperCommand, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            work_dir: work_dir.into(),
        }
    }
}

impl FaceComparator for CommandComparator {
    async fn compare(&mut self, reference: &[u8], probe: &[u8]) -> Result<bool> {
        let reference_path = self.work_dir.join("reference.img");
        let probe_path = self.work_dir.join("probe.png");
        write_work_file(&reference_path, reference).await?;
        write_work_file(&probe_path, probe).await?;

        let stdout = self
            .command
            .run(&[
                ("{reference}", reference_path.display().to_string()),
                ("{probe}", probe_path.display().to_string()),
            ])
            .await?;
        let output: ComparatorOutput = serde_json::from_slice(&stdout)
            .map_err(|e| Error::Verification(format!("unreadable comparator output: {e}")))?;
        Ok(output.verified)
    }
}

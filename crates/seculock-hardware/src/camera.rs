//! Camera driven by an external still-capture command.
//!
//! Board cameras are reached through vendor tools (`rpicam-still`,
//! `fswebcam`), so the driver runs the configured command, waits for it
//! under a timeout and decodes the file it wrote.

use crate::error::{HardwareError, Result};
use crate::traits::Camera;
use crate::types::DeviceInfo;
use image::RgbImage;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Placeholder in the argument list replaced by the output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Still camera behind a capture command.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    output: PathBuf,
    timeout: Duration,
}

impl CommandCamera {
    /// `args` may contain [`OUTPUT_PLACEHOLDER`], which is replaced by
    /// `output` before the command runs.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        output: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            output: output.into(),
            timeout,
        }
    }

    fn expanded_args(&self) -> Vec<String> {
        let output = self.output.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }
}

impl Camera for CommandCamera {
    async fn capture(&mut self) -> Result<RgbImage> {
        let args = self.expanded_args();
        debug!(program = %self.program, ?args, "capturing frame");

        let status = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&args)
                .kill_on_drop(true)
                .status(),
        )
        .await
        .map_err(|_| HardwareError::capture(format!(
            "{} did not finish within {}ms",
            self.program,
            self.timeout.as_millis()
        )))?
        .map_err(|e| HardwareError::capture(format!("failed to run {}: {e}", self.program)))?;

        if !status.success() {
            return Err(HardwareError::capture(format!(
                "{} exited with {status}",
                self.program
            )));
        }

        let bytes = tokio::fs::read(&self.output).await.map_err(|e| {
            HardwareError::capture(format!("read {}: {e}", self.output.display()))
        })?;
        let frame = image::load_from_memory(&bytes)
            .map_err(|e| HardwareError::capture(format!("decode frame: {e}")))?;
        Ok(frame.to_rgb8())
    }

    async fn get_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo::new("command-camera", self.program.clone())
            .with_location(self.output.display().to_string()))
    }
}

//! Mirror tool backed by a robocopy-compatible command line.

use super::{read_log_lines, MirrorOutcome, MirrorRequest, MirrorTool};
use crate::config::MirrorConfig;
use crate::utils::errors::{PrepError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

pub struct RobocopyMirror {
    program: String,
}

impl RobocopyMirror {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(config.program.clone())
    }

    /// Argument vector for `request`.
    pub fn arguments(request: &MirrorRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            request.source.clone().into_os_string(),
            request.destination.clone().into_os_string(),
        ];

        args.push(if request.mirror_deletions { "/MIR" } else { "/E" }.into());

        if !request.exclusions.files.is_empty() {
            args.push("/XF".into());
            args.extend(request.exclusions.files.iter().map(OsString::from));
        }
        if !request.exclusions.dirs.is_empty() {
            args.push("/XD".into());
            args.extend(request.exclusions.dirs.iter().map(OsString::from));
        }

        args.push(format!("/R:{}", request.retry_count).into());
        args.push(format!("/W:{}", request.retry_wait_secs).into());
        if let Some(threads) = request.threads {
            args.push(format!("/MT:{}", threads).into());
        }

        let mut log_arg = OsString::from("/LOG:");
        log_arg.push(request.log_path.as_os_str());
        args.push(log_arg);
        args.push("/FP".into());
        args.push("/NP".into());

        args
    }
}

#[async_trait]
impl MirrorTool for RobocopyMirror {
    async fn run(&self, request: &MirrorRequest) -> Result<MirrorOutcome> {
        let args = Self::arguments(request);
        debug!(program = %self.program, ?args, "Spawning mirror tool");

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PrepError::MirrorTool(format!("failed to start {}: {}", self.program, e)))?;

        // A signal-terminated process has no code; treat it as a hard failure.
        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "Mirror tool stderr");
        }

        info!(program = %self.program, exit_code, "Mirror tool finished");

        Ok(MirrorOutcome {
            exit_code,
            log_lines: read_log_lines(&request.log_path).await?,
        })
    }
}

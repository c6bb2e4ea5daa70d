//! Deployment service control.

use crate::config::ServiceConfig;
use crate::utils::errors::{PrepError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

const SERVICE_PLACEHOLDER: &str = "{service}";

#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Stop `name`. Restarting is left to the build pipeline.
    async fn stop(&self, name: &str) -> Result<()>;
}

/// Stops a service by running a configured command line.
pub struct CommandServiceControl {
    command: Vec<String>,
}

impl CommandServiceControl {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.stop_command.clone())
    }

    /// Program and arguments with the service name filled in.
    pub fn render(&self, name: &str) -> Result<(String, Vec<String>)> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| PrepError::Config("service stop command is empty".to_string()))?;

        let args = args
            .iter()
            .map(|a| a.replace(SERVICE_PLACEHOLDER, name))
            .collect();
        Ok((program.replace(SERVICE_PLACEHOLDER, name), args))
    }
}

#[async_trait]
impl ServiceControl for CommandServiceControl {
    async fn stop(&self, name: &str) -> Result<()> {
        let (program, args) = self.render(name)?;
        info!(service = name, %program, ?args, "Stopping deployment service");

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PrepError::ServiceControl(format!("failed to start {}: {}", program, e)))?;

        if !output.status.success() {
            return Err(PrepError::ServiceControl(format!(
                "stopping {} exited with {}: {}",
                name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!(service = name, "Deployment service stopped");
        Ok(())
    }
}

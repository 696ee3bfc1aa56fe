//! Model client backed by a command-line tool.

use async_trait::async_trait;
use tokio::process::Command;

use super::base::ModelClient;
use crate::types::config::ClientConfig;
use crate::types::ModelReply;
use crate::{ConcordError, ConcordResult};

const MODEL_PLACEHOLDER: &str = "{model}";

/// Client that runs a local CLI once per model call.
///
/// Works with any tool that takes the model id as an argument and the prompt
/// as the final positional argument, printing the answer on stdout.
pub struct CommandClient {
    command: String,
    args: Vec<String>,
    json_args: Vec<String>,
}

impl CommandClient {
    /// Creates a client for `command` with no extra arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            json_args: Vec::new(),
        }
    }

    /// Creates a client from configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            json_args: config.json_args.clone(),
        }
    }

    /// Sets the arguments placed before the prompt.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Returns the command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Full argument list for one call.
    fn build_args(&self, model: &str, prompt: &str, json_mode: bool) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace(MODEL_PLACEHOLDER, model))
            .collect();

        if json_mode {
            args.extend(self.json_args.iter().cloned());
        }

        args.push(prompt.to_string());
        args
    }
}

#[async_trait]
impl ModelClient for CommandClient {
    fn name(&self) -> &str {
        &self.command
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn version(&self) -> ConcordResult<String> {
        let output = Command::new(&self.command).arg("--version").output().await?;

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("unknown")
            .to_string();

        Ok(version)
    }

    async fn query(&self, model: &str, prompt: &str, json_mode: bool) -> ConcordResult<ModelReply> {
        let args = self.build_args(model, prompt, json_mode);

        let output = Command::new(&self.command)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConcordError::ModelQuery(
                        model.to_string(),
                        format!("command '{}' not found", self.command),
                    )
                } else {
                    ConcordError::ModelQuery(model.to_string(), e.to_string())
                }
            })?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(ModelReply::new(stdout.trim()))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ConcordError::ModelQuery(
                model.to_string(),
                stderr.trim().to_string(),
            ))
        }
    }
}

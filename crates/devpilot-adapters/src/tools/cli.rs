//! Command-line tool wrappers.
//!
//! A `CliTool` runs `<program> <args...>` with the call's `command` argument
//! split into argv. There is no shell: pipes, globs and redirections reach
//! the program as literal arguments.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use devpilot_contracts::message::Arguments;
use devpilot_core::traits::ToolAdapter;

use super::string_arg;

/// How the `command` argument becomes argv.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgSplit {
    #[default]
    Whitespace,
    /// POSIX shell quoting rules, so `'SELECT * FROM t'` stays one argument.
    Shell,
}

/// A command run before every invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preflight {
    pub program: String,
    pub args: Vec<String>,
    /// When set, a non-zero exit aborts the call with
    /// `"{failure_prefix}: {stderr}"`. When unset the exit status is ignored.
    pub failure_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CliTool {
    program: String,
    /// Used in error strings; usually the program name.
    label: String,
    split: ArgSplit,
    preflight: Option<Preflight>,
    /// Set when the tool cannot run at all in this environment.
    unavailable: Option<String>,
}

impl CliTool {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            label: program.clone(),
            program,
            split: ArgSplit::Whitespace,
            preflight: None,
            unavailable: None,
        }
    }

    pub fn with_split(mut self, split: ArgSplit) -> Self {
        self.split = split;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_preflight(mut self, preflight: Preflight) -> Self {
        self.preflight = Some(preflight);
        self
    }

    /// `bq`, with shell-style splitting so quoted SQL survives.
    pub fn bq() -> Self {
        Self::new("bq").with_split(ArgSplit::Shell)
    }

    /// `aws`, checking the caller identity before every command.
    pub fn aws() -> Self {
        Self::new("aws").with_preflight(Preflight {
            program: "aws".to_string(),
            args: vec!["sts".to_string(), "get-caller-identity".to_string()],
            failure_prefix: Some("Error fetching account info".to_string()),
        })
    }

    /// `az`, logging in with the managed identity `client_id` before every
    /// command. Without a client id every call fails with a notice.
    pub fn azure(client_id: Option<String>) -> Self {
        let tool = Self::new("az").with_label("azure");
        match client_id {
            Some(id) => tool.with_preflight(Preflight {
                program: "az".to_string(),
                args: vec![
                    "login".to_string(),
                    "--identity".to_string(),
                    "--username".to_string(),
                    id,
                ],
                failure_prefix: None,
            }),
            None => Self {
                unavailable: Some("AZURE_CLIENT_ID environment variable not set".to_string()),
                ..tool
            },
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn argv(&self, command: &str) -> Result<Vec<String>, String> {
        match self.split {
            ArgSplit::Whitespace => Ok(command.split_whitespace().map(str::to_string).collect()),
            ArgSplit::Shell => {
                shlex::split(command).ok_or_else(|| format!("cannot parse command '{command}'"))
            }
        }
    }

    fn error(&self, reason: impl std::fmt::Display) -> String {
        format!("Error executing {} command: {}", self.label, reason)
    }

    async fn preflight(&self, preflight: &Preflight) -> Result<(), String> {
        let output = Command::new(&preflight.program)
            .args(&preflight.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.error(e))?;

        match &preflight.failure_prefix {
            Some(prefix) if !output.status.success() => Err(format!(
                "{}: {}",
                prefix,
                String::from_utf8_lossy(&output.stderr)
            )),
            _ => {
                debug!(
                    program = %preflight.program,
                    status = %output.status,
                    stdout = %String::from_utf8_lossy(&output.stdout),
                    "preflight finished"
                );
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ToolAdapter for CliTool {
    async fn invoke(&self, arguments: &Arguments) -> String {
        if let Some(reason) = &self.unavailable {
            return self.error(reason);
        }
        let Some(command) = string_arg(arguments, "command") else {
            return self.error("missing 'command' argument");
        };
        let argv = match self.argv(command) {
            Ok(argv) => argv,
            Err(reason) => return self.error(reason),
        };

        if let Some(preflight) = &self.preflight {
            if let Err(result) = self.preflight(preflight).await {
                warn!(program = %self.program, "preflight failed");
                return result;
            }
        }

        info!(program = %self.program, command = %command, "executing command");
        let output = match Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => return self.error(e),
        };

        debug!(
            program = %self.program,
            status = %output.status,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "command finished"
        );

        if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn command(cmd: &str) -> Arguments {
        json!({ "command": cmd }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_stdout_is_returned() {
        let tool = CliTool::new("echo");
        assert_eq!(tool.invoke(&command("pods   are running")).await, "pods are running\n");
    }

    #[tokio::test]
    async fn test_stderr_when_stdout_empty() {
        let tool = CliTool::new("ls");
        let result = tool.invoke(&command("/definitely/not/a/real/path")).await;
        assert!(!result.is_empty());
        assert!(result.contains("/definitely/not/a/real/path"), "unexpected: {result}");
    }

    #[tokio::test]
    async fn test_missing_program_is_reported() {
        let tool = CliTool::new("devpilot-no-such-binary");
        let result = tool.invoke(&command("get pods")).await;
        assert!(
            result.starts_with("Error executing devpilot-no-such-binary command:"),
            "unexpected: {result}"
        );
    }

    #[tokio::test]
    async fn test_shell_split_keeps_quoted_argument() {
        let tool = CliTool::new("echo").with_split(ArgSplit::Shell);
        let result = tool.invoke(&command("'SELECT  *' FROM")).await;
        assert_eq!(result, "SELECT  * FROM\n");
    }

    #[tokio::test]
    async fn test_unbalanced_quotes_are_reported() {
        let result = CliTool::bq().invoke(&command("query 'SELECT")).await;
        assert!(result.starts_with("Error executing bq command: cannot parse"), "unexpected: {result}");
    }

    #[tokio::test]
    async fn test_failed_preflight_short_circuits() {
        let tool = CliTool::new("echo").with_preflight(Preflight {
            program: "false".to_string(),
            args: Vec::new(),
            failure_prefix: Some("Error fetching account info".to_string()),
        });
        let result = tool.invoke(&command("never printed")).await;
        assert!(result.starts_with("Error fetching account info: "), "unexpected: {result}");
    }

    #[tokio::test]
    async fn test_ignored_preflight_failure_still_runs() {
        let tool = CliTool::new("echo").with_preflight(Preflight {
            program: "false".to_string(),
            args: Vec::new(),
            failure_prefix: None,
        });
        assert_eq!(tool.invoke(&command("ok")).await, "ok\n");
    }

    #[tokio::test]
    async fn test_azure_without_client_id() {
        let result = CliTool::azure(None).invoke(&command("vm list")).await;
        assert_eq!(
            result,
            "Error executing azure command: AZURE_CLIENT_ID environment variable not set"
        );
    }

    #[tokio::test]
    async fn test_missing_command_argument() {
        let args = json!({ "cmd": "ps" }).as_object().cloned().unwrap();
        let result = CliTool::new("docker").invoke(&args).await;
        assert_eq!(result, "Error executing docker command: missing 'command' argument");
    }
}

use std::process::{Command, Stdio};

use crate::error::TransportError;

/// Runs external commands on behalf of the detector and the remote channel.
pub trait CommandRunner {
    /// Run to completion and return trimmed stdout. Non-zero exit is an error.
    fn output(&mut self, parts: &[String]) -> Result<String, TransportError>;

    /// Run to completion, discarding output. Non-zero exit is an error.
    fn status(&mut self, parts: &[String]) -> Result<(), TransportError>;
}

/// Split a configured script (which may carry its own arguments) and append `args`.
pub fn build_command(script: &str, args: &[&str]) -> Result<Vec<String>, TransportError> {
    let mut parts =
        shlex::split(script).ok_or_else(|| TransportError::Unparsable(script.to_string()))?;
    if parts.is_empty() {
        return Err(TransportError::Unparsable(script.to_string()));
    }
    parts.extend(args.iter().map(|a| a.to_string()));
    Ok(parts)
}

fn command_line(parts: &[String]) -> String {
    parts.join(" ")
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(parts: &[String]) -> Result<Command, TransportError> {
        let (program, args) = parts
            .split_first()
            .ok_or_else(|| TransportError::Unparsable(String::new()))?;
        let resolved = which::which(program).map_err(|e| TransportError::Launch {
            command: command_line(parts),
            reason: e.to_string(),
        })?;
        let mut cmd = Command::new(resolved);
        cmd.args(args);
        Ok(cmd)
    }
}

impl CommandRunner for SystemRunner {
    fn output(&mut self, parts: &[String]) -> Result<String, TransportError> {
        tracing::debug!(command = %command_line(parts), "running");
        let output = Self::command(parts)?
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| TransportError::Launch {
                command: command_line(parts),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(TransportError::ExitCode {
                command: command_line(parts),
                code: output.status.code().unwrap_or(-1),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn status(&mut self, parts: &[String]) -> Result<(), TransportError> {
        tracing::debug!(command = %command_line(parts), "launching");
        let status = Self::command(parts)?
            .stdin(Stdio::null())
            .status()
            .map_err(|e| TransportError::Launch {
                command: command_line(parts),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(TransportError::ExitCode {
                command: command_line(parts),
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_arguments_are_kept() {
        let parts = build_command("gvim -u NONE", &["--version"]).unwrap();
        assert_eq!(parts, vec!["gvim", "-u", "NONE", "--version"]);
    }

    #[test]
    fn quoted_script_path_is_one_part() {
        let parts = build_command("\"/opt/my vim/bin/gvim\"", &["--serverlist"]).unwrap();
        assert_eq!(parts, vec!["/opt/my vim/bin/gvim", "--serverlist"]);
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(
            build_command("   ", &["--version"]),
            Err(TransportError::Unparsable(_))
        ));
    }

    #[test]
    fn missing_program_is_a_launch_failure() {
        let parts = build_command("definitely-not-an-editor-binary-xyz", &["--version"]).unwrap();
        match SystemRunner.status(&parts).unwrap_err() {
            TransportError::Launch { command, .. } => {
                assert_eq!(command, "definitely-not-an-editor-binary-xyz --version")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exit_code_message_names_command() {
        let err = TransportError::ExitCode {
            command: "gvim --version".into(),
            code: 2,
        };
        assert_eq!(err.to_string(), "'gvim --version' returned exit code '2'.");
    }
}

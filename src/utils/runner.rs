//! External process execution

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::process::Command;

/// Handle for running external commands.
///
/// Built once in `main` from the global flags and passed by reference into
/// every component, so verbosity and dry-run never rely on ambient state.
/// Retrying is not this type's job: callers needing to wait for convergence
/// go through the readiness waiter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmdRunner {
    pub verbose: bool,
    pub dry_run: bool,
}

impl CmdRunner {
    pub fn new(verbose: bool, dry_run: bool) -> Self {
        Self { verbose, dry_run }
    }

    /// Render the exact command line a call executes, shell-quoted.
    pub fn command_line(command: &str, args: &[&str]) -> String {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(command);
        words.extend_from_slice(args);
        shell_words::join(words)
    }

    /// Run a mutating command.
    ///
    /// Under dry-run the command is never spawned; the exact command line is
    /// logged instead. Verbose mode streams the child's output to the
    /// operator in real time; otherwise the output is captured and only
    /// surfaced inside the error, with `failure_msg` as the context.
    pub fn run(&self, command: &str, args: &[&str], failure_msg: &str) -> Result<()> {
        let command_line = Self::command_line(command, args);
        if self.dry_run {
            crate::log_info!("{} {}", "Would run".cyan().bold(), command_line);
            return Ok(());
        }

        crate::log_debug!("Running {}", command_line);

        if self.verbose {
            let status = Command::new(command)
                .args(args)
                .status()
                .with_context(|| format!("Failed to execute {}", command))?;

            if !status.success() {
                return Err(anyhow!("{}", failure_msg));
            }
        } else {
            let output = Command::new(command)
                .args(args)
                .output()
                .with_context(|| format!("Failed to execute {}", command))?;

            if !output.status.success() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(anyhow!(
                    "{}\n{}{}",
                    failure_msg,
                    stdout.trim_end(),
                    stderr.trim_end()
                ));
            }
        }

        Ok(())
    }

    /// Run a read-only query and capture its stdout.
    ///
    /// Queries execute even under dry-run: discovery has to observe live
    /// state so the "Would run" lines name real namespaces and resources.
    pub fn capture(&self, command: &str, args: &[&str], failure_msg: &str) -> Result<String> {
        crate::log_debug!("Running {}", Self::command_line(command, args));

        let output = Command::new(command)
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute {}", command))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("{}: {}", failure_msg, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Tolerant query variant for discovery: absence is valid state, so a
    /// failure is logged at debug level and yields `None` instead of an
    /// error.
    pub fn capture_ok(&self, command: &str, args: &[&str]) -> Option<String> {
        match Command::new(command).args(args).output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Ok(output) => {
                crate::log_debug!(
                    "{} failed: {}",
                    Self::command_line(command, args),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(err) => {
                crate::log_debug!("Failed to execute {}: {}", command, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_is_exact_argv() {
        let line = CmdRunner::command_line(
            "helm",
            &["upgrade", "-n", "default", "--set", "fqdn=srv.example.com"],
        );
        assert_eq!(line, "helm upgrade -n default --set fqdn=srv.example.com");
    }

    #[test]
    fn test_command_line_quotes_json_arguments() {
        let line = CmdRunner::command_line(
            "helm",
            &["--set-json", r#"annotations={"cert-manager.io/issuer": "ca"}"#],
        );
        assert!(line.contains("annotations="));
        // The argument round-trips through shell quoting unchanged
        let words = shell_words::split(&line).unwrap();
        assert_eq!(words[2], r#"annotations={"cert-manager.io/issuer": "ca"}"#);
    }

    #[test]
    fn test_dry_run_does_not_spawn() {
        let runner = CmdRunner::new(false, true);
        // A command that cannot exist: executing it would error out
        let result = runner.run("/nonexistent/uyuni-adm-test-binary", &["arg"], "boom");
        assert!(result.is_ok());
    }

    #[test]
    fn test_run_reports_failure_message() {
        let runner = CmdRunner::new(false, false);
        let err = runner
            .run("sh", &["-c", "echo oops >&2; exit 3"], "step failed")
            .unwrap_err();
        let text = format!("{}", err);
        assert!(text.contains("step failed"));
        assert!(text.contains("oops"));
    }

    #[test]
    fn test_capture_trims_output() {
        let runner = CmdRunner::default();
        let out = runner.capture("sh", &["-c", "echo hello"], "failed").unwrap();
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_capture_ok_tolerates_failure() {
        let runner = CmdRunner::default();
        assert_eq!(runner.capture_ok("sh", &["-c", "exit 1"]), None);
        assert_eq!(
            runner.capture_ok("/nonexistent/uyuni-adm-test-binary", &[]),
            None
        );
        assert_eq!(
            runner.capture_ok("sh", &["-c", "echo found"]),
            Some("found".to_string())
        );
    }
}

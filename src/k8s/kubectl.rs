//! kubectl wrapper utilities

use crate::utils::runner::CmdRunner;
use crate::utils::waiter::{self, RetryPolicy};
use anyhow::Result;
use std::path::Path;

/// Apply a manifest file
pub fn apply_file(runner: &CmdRunner, path: &Path, failure_msg: &str) -> Result<()> {
    let path = path.display().to_string();
    runner.run("kubectl", &["apply", "-f", &path], failure_msg)
}

/// Best-effort deletion of named resources; failures are logged and
/// swallowed since the resources may legitimately be absent
pub fn delete_tolerant(runner: &CmdRunner, namespace: &str, kind: &str, names: &[&str]) {
    let mut args = vec!["delete", "-n", namespace, kind];
    args.extend_from_slice(names);

    let failure_msg = format!("Failed to delete {} {}", kind, names.join(" "));
    if let Err(err) = runner.run("kubectl", &args, &failure_msg) {
        crate::log_info!("{:#}", err);
    }
}

/// Whether a deployment reports at least one ready replica
pub fn is_deployment_ready(runner: &CmdRunner, namespace: Option<&str>, name: &str) -> bool {
    let mut args = vec!["get", "-o", "jsonpath={.status.readyReplicas}", "deploy"];
    if let Some(namespace) = namespace {
        args.extend_from_slice(&["-n", namespace]);
    }
    args.push(name);

    runner
        .capture_ok("kubectl", &args)
        .and_then(|out| out.parse::<u32>().ok())
        .is_some_and(|replicas| replicas > 0)
}

/// Block until a deployment has a ready replica; exhausting the policy is
/// fatal for the caller since dependent steps need the deployment live
pub fn wait_for_deployment(
    runner: &CmdRunner,
    policy: &RetryPolicy,
    namespace: Option<&str>,
    name: &str,
) -> Result<()> {
    if runner.dry_run {
        crate::log_info!("Would wait for deployment {} to be ready", name);
        return Ok(());
    }

    waiter::wait_until(policy, &format!("deployment {}", name), || {
        is_deployment_ready(runner, namespace, name).then_some(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_deployment_is_not_ready() {
        // No cluster in the test environment: the tolerant query yields
        // nothing and the deployment reads as not ready rather than erroring
        let runner = CmdRunner::default();
        assert!(!is_deployment_ready(&runner, Some("default"), "uyuni"));
    }

    #[test]
    fn test_wait_for_deployment_dry_run_returns_immediately() {
        let runner = CmdRunner::new(false, true);
        let policy = RetryPolicy::default();
        assert!(wait_for_deployment(&runner, &policy, None, "uyuni").is_ok());
    }
}

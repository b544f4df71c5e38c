//! helm release management

use crate::utils::runner::CmdRunner;
use anyhow::Result;
use std::path::Path;

/// Label attached to every resource of releases this tool installs
pub const INSTALLED_BY_LABEL: &str = "installedby";
/// Marker value identifying this tool; uninstall only removes shared
/// dependencies carrying it
pub const INSTALLED_BY_VALUE: &str = "uyuniadm";

/// Label selector matching only what this tool installed
pub fn installed_by_filter() -> String {
    format!("-l{}={}", INSTALLED_BY_LABEL, INSTALLED_BY_VALUE)
}

/// Run helm upgrade.
///
/// With `install` set, `--install` makes the same call install an absent
/// release and `--create-namespace` provisions its namespace. A non-empty
/// `repo` or `version` adds the matching helm parameter.
#[allow(clippy::too_many_arguments)]
pub fn helm_upgrade(
    runner: &CmdRunner,
    kubeconfig: Option<&Path>,
    namespace: &str,
    install: bool,
    repo: &str,
    name: &str,
    chart: &str,
    version: &str,
    args: &[&str],
) -> Result<()> {
    let mut helm_args: Vec<&str> = vec![
        "upgrade",
        "-n",
        namespace,
        "--create-namespace",
        name,
        chart,
    ];

    let kubeconfig = kubeconfig.map(|path| path.display().to_string());
    if let Some(kubeconfig) = &kubeconfig {
        helm_args.extend_from_slice(&["--kubeconfig", kubeconfig.as_str()]);
    }

    if !repo.is_empty() {
        helm_args.extend_from_slice(&["--repo", repo]);
    }
    if !version.is_empty() {
        helm_args.extend_from_slice(&["--version", version]);
    }
    if install {
        helm_args.push("--install");
    }

    helm_args.extend_from_slice(args);

    let command = if install { "install" } else { "upgrade" };
    let failure_msg = format!(
        "Failed to {} helm chart {} in namespace {}",
        command, chart, namespace
    );
    runner.run("helm", &helm_args, &failure_msg)
}

/// Uninstall the release owning a deployment, wherever it lives.
///
/// The namespace is discovered by scanning all namespaces for a deployment
/// of that name; `label_filter` narrows the scan, so passing the
/// installed-by selector leaves foreign installations untouched. A missing
/// deployment skips the removal instead of failing. Returns the namespace
/// the release was found in.
pub fn helm_uninstall(
    runner: &CmdRunner,
    kubeconfig: Option<&Path>,
    deployment: &str,
    label_filter: Option<&str>,
) -> Result<Option<String>> {
    let jsonpath = format!(
        "jsonpath={{.items[?(@.metadata.name==\"{}\")].metadata.namespace}}",
        deployment
    );
    let mut args: Vec<&str> = vec!["get", "-A", "deploy", "-o", &jsonpath];
    if let Some(filter) = label_filter {
        args.push(filter);
    }

    let Some(namespace) = runner
        .capture_ok("kubectl", &args)
        .and_then(|out| out.split_whitespace().next().map(str::to_string))
    else {
        crate::log_info!("No {} deployment found, skipping removal", deployment);
        return Ok(None);
    };

    let mut helm_args: Vec<&str> = Vec::new();
    let kubeconfig = kubeconfig.map(|path| path.display().to_string());
    if let Some(kubeconfig) = &kubeconfig {
        helm_args.extend_from_slice(&["--kubeconfig", kubeconfig.as_str()]);
    }
    helm_args.extend_from_slice(&["uninstall", "-n", namespace.as_str(), deployment]);

    crate::log_info!("Uninstalling {}", deployment);
    runner.run(
        "helm",
        &helm_args,
        &format!("Failed to uninstall {}", deployment),
    )?;

    Ok(Some(namespace))
}

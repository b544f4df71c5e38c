//! Uninstall command implementation
//!
//! Every removal step tolerates absent state: a partial deploy, or a
//! previous uninstall, must not make teardown fail.

use crate::config::SERVER_VOLUMES;
use crate::k8s::{ClusterFlavor, ClusterInfos, certs, deploy, helm, ingress, kubectl};
use crate::utils::copy::PODMAN_CONTAINER;
use crate::utils::runner::CmdRunner;
use crate::utils::{prereqs, prompt};
use anyhow::Result;

/// Remove the server and everything this tool installed from the cluster
pub fn kubernetes(runner: &CmdRunner, assume_yes: bool) -> Result<()> {
    prereqs::check_all(&prereqs::kubernetes())?;

    if !confirmed(runner, assume_yes, "Remove the Uyuni server from the cluster?")? {
        return Ok(());
    }

    let infos = ClusterInfos::detect(runner)?;
    let kubeconfig = infos.kubeconfig();

    // Remove the server release and the residual certificate objects
    match helm::helm_uninstall(runner, kubeconfig, deploy::HELM_APP_NAME, None) {
        Ok(Some(namespace)) => {
            kubectl::delete_tolerant(runner, &namespace, "configmap", &[certs::CA_CONFIGMAP_NAME]);
            kubectl::delete_tolerant(
                runner,
                &namespace,
                "secret",
                &[certs::CA_SECRET_NAME, certs::CERT_SECRET_NAME],
            );
        }
        Ok(None) => (),
        Err(err) => crate::log_info!("{:#}", err),
    }

    // Only remove cert-manager if this tool installed it
    let filter = helm::installed_by_filter();
    tolerate(
        helm::helm_uninstall(runner, kubeconfig, "cert-manager", Some(filter.as_str()))
            .map(|_| ()),
    );

    match infos.flavor() {
        ClusterFlavor::K3s => ingress::uninstall_k3s_traefik_config(runner),
        ClusterFlavor::Rke2 => ingress::uninstall_rke2_nginx_config(runner),
        ClusterFlavor::None => (),
    }

    Ok(())
}

/// Remove the server container, and with `purge_volumes` its data volumes
pub fn podman(runner: &CmdRunner, assume_yes: bool, purge_volumes: bool) -> Result<()> {
    prereqs::check_all(&prereqs::podman())?;

    let question = if purge_volumes {
        "Remove the Uyuni server and all its data volumes?"
    } else {
        "Remove the Uyuni server container?"
    };
    if !confirmed(runner, assume_yes, question)? {
        return Ok(());
    }

    let running = runner
        .capture_ok(
            "podman",
            &["ps", "-a", "-q", "-f", &format!("name={}", PODMAN_CONTAINER)],
        )
        .is_some_and(|out| !out.is_empty());

    if running {
        tolerate(runner.run(
            "podman",
            &["stop", PODMAN_CONTAINER],
            "Failed to stop the server container",
        ));
        tolerate(runner.run(
            "podman",
            &["rm", PODMAN_CONTAINER],
            "Failed to remove the server container",
        ));
    } else {
        crate::log_info!("No {} container found, skipping removal", PODMAN_CONTAINER);
    }

    if purge_volumes {
        for &(volume, _) in SERVER_VOLUMES {
            let exists = runner
                .capture_ok("podman", &["volume", "exists", volume])
                .is_some();
            if exists {
                tolerate(runner.run(
                    "podman",
                    &["volume", "rm", volume],
                    &format!("Failed to remove volume {}", volume),
                ));
            }
        }
    }

    Ok(())
}

fn confirmed(runner: &CmdRunner, assume_yes: bool, question: &str) -> Result<bool> {
    if assume_yes || runner.dry_run {
        return Ok(true);
    }
    if prompt::confirm(question)? {
        Ok(true)
    } else {
        crate::log_info!("Aborted");
        Ok(false)
    }
}

/// Teardown keeps going past individual failures
fn tolerate(result: Result<()>) {
    if let Err(err) = result {
        crate::log_info!("{:#}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_skips_confirmation() {
        let runner = CmdRunner::new(false, true);
        // Must not block on a prompt
        assert!(confirmed(&runner, false, "really?").unwrap());
    }

    #[test]
    fn test_tolerate_swallows_errors() {
        tolerate(Err(anyhow::anyhow!("boom")));
    }
}

//! Flavor-specific ingress configuration
//!
//! K3s and RKE2 pick up HelmChartConfig manifests dropped into their
//! static manifests directory. The server needs extra TCP/UDP ports
//! exposed through the ingress controller, so install writes such a
//! manifest and uninstall removes it again.

use crate::utils::runner::CmdRunner;
use crate::utils::waiter::{self, RetryPolicy};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const K3S_TRAEFIK_CONFIG_PATH: &str =
    "/var/lib/rancher/k3s/server/manifests/k3s-traefik-config.yaml";
pub const RKE2_NGINX_CONFIG_PATH: &str =
    "/var/lib/rancher/rke2/server/manifests/rke2-ingress-nginx-config.yaml";

const K3S_TRAEFIK_CONFIG: &str = r#"apiVersion: helm.cattle.io/v1
kind: HelmChartConfig
metadata:
  name: traefik
  namespace: kube-system
spec:
  valuesContent: |-
    ports:
      postgres:
        port: 5432
        expose: true
        exposedPort: 5432
        protocol: TCP
      salt-publish:
        port: 4505
        expose: true
        exposedPort: 4505
        protocol: TCP
      salt-request:
        port: 4506
        expose: true
        exposedPort: 4506
        protocol: TCP
      tftp:
        port: 69
        expose: true
        exposedPort: 69
        protocol: UDP
"#;

fn rke2_nginx_config(namespace: &str) -> String {
    format!(
        r#"apiVersion: helm.cattle.io/v1
kind: HelmChartConfig
metadata:
  name: rke2-ingress-nginx
  namespace: kube-system
spec:
  valuesContent: |-
    controller:
      config:
        hsts: "false"
    tcp:
      5432: "{namespace}/uyuni-tcp:5432"
      4505: "{namespace}/uyuni-tcp:4505"
      4506: "{namespace}/uyuni-tcp:4506"
    udp:
      69: "{namespace}/uyuni-udp:69"
"#
    )
}

/// Expose the server ports through the embedded Traefik.
/// K3s redeploys Traefik when the manifest changes, so wait for the
/// redeploy job to complete before installing anything behind it.
pub fn install_k3s_traefik_config(runner: &CmdRunner, policy: &RetryPolicy) -> Result<()> {
    crate::log_info!("Installing K3s Traefik configuration");

    write_config(runner, K3S_TRAEFIK_CONFIG_PATH, K3S_TRAEFIK_CONFIG)?;
    if runner.dry_run {
        return Ok(());
    }

    crate::log_info!("Waiting for Traefik to be reloaded");
    waiter::wait_until(policy, "Traefik reload", || {
        runner
            .capture_ok(
                "kubectl",
                &[
                    "get",
                    "job",
                    "-n",
                    "kube-system",
                    "-o",
                    "jsonpath={.status.completionTime}",
                    "helm-install-traefik",
                ],
            )
            .filter(|out| !out.is_empty())
            .map(|_| ())
    })
}

/// Expose the server ports through the RKE2 nginx ingress
pub fn install_rke2_nginx_config(runner: &CmdRunner, namespace: &str) -> Result<()> {
    crate::log_info!("Installing RKE2 nginx configuration");
    write_config(runner, RKE2_NGINX_CONFIG_PATH, &rke2_nginx_config(namespace))
}

pub fn uninstall_k3s_traefik_config(runner: &CmdRunner) {
    remove_config(runner, K3S_TRAEFIK_CONFIG_PATH);
}

pub fn uninstall_rke2_nginx_config(runner: &CmdRunner) {
    remove_config(runner, RKE2_NGINX_CONFIG_PATH);
}

fn write_config(runner: &CmdRunner, path: &str, content: &str) -> Result<()> {
    if runner.dry_run {
        crate::log_info!("Would write {}", path);
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path))
}

/// Best-effort removal: an absent file is a no-op, anything else is
/// logged and teardown continues
fn remove_config(runner: &CmdRunner, path: &str) {
    if !Path::new(path).exists() {
        return;
    }
    if runner.dry_run {
        crate::log_info!("Would remove {}", path);
        return;
    }

    crate::log_info!("Removing {}", path);
    if let Err(err) = fs::remove_file(path) {
        crate::log_warn!("Failed to remove {}: {}", path, err);
    }
}

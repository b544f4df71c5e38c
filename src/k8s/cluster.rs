//! Cluster environment probing

use crate::utils::runner::CmdRunner;
use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

/// Kubernetes distribution flavor, derived from the kubelet version string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterFlavor {
    /// Generic cluster, no distribution-specific handling
    None,
    K3s,
    Rke2,
}

/// Characteristics of the target cluster.
///
/// Probed once per invocation and read-only afterwards; every later
/// decision in the pipelines conditions on this value.
#[derive(Debug, Clone)]
pub struct ClusterInfos {
    pub kubelet_version: String,
    pub ingress: String,
    pub kubeconfig: Option<PathBuf>,
}

impl ClusterInfos {
    /// Probe the active cluster. Fails only when the cluster itself is
    /// unreachable; an unrecognized distribution yields
    /// [`ClusterFlavor::None`] with best-effort ingress defaulting.
    pub fn detect(runner: &CmdRunner) -> Result<Self> {
        let kubelet_version = runner.capture(
            "kubectl",
            &[
                "get",
                "node",
                "-o",
                "jsonpath={.items[0].status.nodeInfo.kubeletVersion}",
            ],
            "Failed to reach the cluster",
        )?;

        let infos = Self {
            kubelet_version,
            ingress: guess_ingress(runner),
            kubeconfig: find_kubeconfig(),
        };
        crate::log_debug!(
            "Detected kubelet {} with {} ingress",
            infos.kubelet_version,
            if infos.ingress.is_empty() {
                "no"
            } else {
                infos.ingress.as_str()
            }
        );
        Ok(infos)
    }

    pub fn flavor(&self) -> ClusterFlavor {
        flavor_from_kubelet(&self.kubelet_version)
    }

    pub fn is_k3s(&self) -> bool {
        self.flavor() == ClusterFlavor::K3s
    }

    pub fn is_rke2(&self) -> bool {
        self.flavor() == ClusterFlavor::Rke2
    }

    pub fn kubeconfig(&self) -> Option<&Path> {
        self.kubeconfig.as_deref()
    }
}

fn flavor_from_kubelet(version: &str) -> ClusterFlavor {
    if version.contains("k3s") {
        ClusterFlavor::K3s
    } else if version.contains("rke2") {
        ClusterFlavor::Rke2
    } else {
        ClusterFlavor::None
    }
}

/// Best-effort ingress class guess; empty when nothing recognizable runs.
/// The guess only seeds the helm parameters and the user can override it.
fn guess_ingress(runner: &CmdRunner) -> String {
    // A Traefik CRD means the embedded traefik handles ingress
    if runner
        .capture_ok("kubectl", &["explain", "ingressroutes.traefik.io"])
        .is_some()
        || runner
            .capture_ok("kubectl", &["explain", "ingressroutes.traefik.containo.us"])
            .is_some()
    {
        return "traefik".to_string();
    }

    // Look for a pod running an nginx ingress controller
    if let Some(out) = runner.capture_ok(
        "kubectl",
        &[
            "get",
            "pod",
            "-A",
            "-o",
            "jsonpath={range .items[*]}{.spec.containers[*].args[0]}{end}",
        ],
    ) {
        if out.contains("nginx-ingress-controller") || out.contains("ingress-nginx") {
            return "nginx".to_string();
        }
    }

    String::new()
}

fn find_kubeconfig() -> Option<PathBuf> {
    if let Ok(path) = env::var("KUBECONFIG") {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let default = dirs::home_dir()?.join(".kube").join("config");
    default.exists().then_some(default)
}

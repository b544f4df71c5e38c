//! Uyuni release installation and upgrade

use crate::config::flags::{HelmFlags, ImageFlags};
use crate::k8s::cluster::{ClusterFlavor, ClusterInfos};
use crate::k8s::{helm, ingress, kubectl};
use crate::utils::runner::CmdRunner;
use crate::utils::waiter::RetryPolicy;
use anyhow::Result;
use std::path::Path;

/// Name of the server helm release and of its deployment
pub const HELM_APP_NAME: &str = "uyuni";

/// Install or upgrade the whole server stack on the detected cluster
pub fn deploy(
    runner: &CmdRunner,
    policy: &RetryPolicy,
    infos: &ClusterInfos,
    image: &ImageFlags,
    helm_flags: &HelmFlags,
    fqdn: &str,
    extra_helm_args: &[String],
) -> Result<()> {
    match infos.flavor() {
        ClusterFlavor::K3s => ingress::install_k3s_traefik_config(runner, policy)?,
        ClusterFlavor::Rke2 => {
            ingress::install_rke2_nginx_config(runner, &helm_flags.uyuni.namespace)?
        }
        ClusterFlavor::None => (),
    }

    uyuni_upgrade(
        runner,
        image,
        helm_flags,
        infos.kubeconfig(),
        fqdn,
        &infos.ingress,
        extra_helm_args,
    )?;

    kubectl::wait_for_deployment(
        runner,
        policy,
        Some(&helm_flags.uyuni.namespace),
        HELM_APP_NAME,
    )
}

/// Install or upgrade the uyuni release itself
pub fn uyuni_upgrade(
    runner: &CmdRunner,
    image: &ImageFlags,
    helm_flags: &HelmFlags,
    kubeconfig: Option<&Path>,
    fqdn: &str,
    ingress: &str,
    extra_helm_args: &[String],
) -> Result<()> {
    crate::log_info!("Installing Uyuni");

    let params = uyuni_helm_params(image, helm_flags, fqdn, ingress, extra_helm_args);
    let params: Vec<&str> = params.iter().map(String::as_str).collect();

    helm::helm_upgrade(
        runner,
        kubeconfig,
        &helm_flags.uyuni.namespace,
        true,
        "",
        HELM_APP_NAME,
        &helm_flags.uyuni.chart,
        &helm_flags.uyuni.version,
        &params,
    )
}

/// Assemble the release parameters in precedence order: later entries
/// override earlier ones on conflict.
///
/// The guessed ingress goes first so a user values file can correct it;
/// the values computed from the command line go after the file so an
/// explicit image or FQDN always wins; caller extras come last.
fn uyuni_helm_params(
    image: &ImageFlags,
    helm_flags: &HelmFlags,
    fqdn: &str,
    ingress: &str,
    extra_helm_args: &[String],
) -> Vec<String> {
    let mut params = vec!["--set".to_string(), format!("ingress={}", ingress)];

    if let Some(values) = &helm_flags.uyuni.values {
        params.push("-f".to_string());
        params.push(values.display().to_string());
    }

    params.push("--set".to_string());
    params.push(format!("images.server={}", image.reference()));
    params.push("--set".to_string());
    params.push(format!("fqdn={}", fqdn));

    params.extend(extra_helm_args.iter().cloned());

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::flags::ChartFlags;
    use std::path::PathBuf;

    fn helm_flags(values: Option<PathBuf>) -> HelmFlags {
        HelmFlags {
            uyuni: ChartFlags {
                chart: "oci://registry.opensuse.org/uyuni/server-helm".to_string(),
                version: String::new(),
                namespace: "default".to_string(),
                values,
            },
            cert_manager: ChartFlags {
                chart: String::new(),
                version: String::new(),
                namespace: "cert-manager".to_string(),
                values: None,
            },
        }
    }

    fn image() -> ImageFlags {
        ImageFlags {
            name: "registry.opensuse.org/uyuni/server".to_string(),
            tag: "2024.07".to_string(),
        }
    }

    #[test]
    fn test_explicit_image_overrides_values_file() {
        // helm applies later parameters over earlier ones, so the
        // command-line image must come after the values file
        let params = uyuni_helm_params(
            &image(),
            &helm_flags(Some(PathBuf::from("/tmp/overrides.yaml"))),
            "srv.example.com",
            "traefik",
            &[],
        );

        let file_pos = params.iter().position(|p| p == "-f").unwrap();
        let image_pos = params
            .iter()
            .position(|p| p.starts_with("images.server="))
            .unwrap();
        assert!(image_pos > file_pos);
        assert_eq!(
            params[image_pos],
            "images.server=registry.opensuse.org/uyuni/server:2024.07"
        );
    }

    #[test]
    fn test_values_file_overrides_guessed_ingress() {
        let params = uyuni_helm_params(
            &image(),
            &helm_flags(Some(PathBuf::from("/tmp/overrides.yaml"))),
            "srv.example.com",
            "traefik",
            &[],
        );

        let ingress_pos = params.iter().position(|p| p == "ingress=traefik").unwrap();
        let file_pos = params.iter().position(|p| p == "-f").unwrap();
        assert!(file_pos > ingress_pos);
    }

    #[test]
    fn test_extra_args_come_last() {
        let extra = vec![
            "--set-json".to_string(),
            "ingressSslAnnotations={\"cert-manager.io/issuer\": \"uyuni-ca-issuer\"}".to_string(),
        ];
        let params = uyuni_helm_params(&image(), &helm_flags(None), "srv.example.com", "", &extra);

        assert_eq!(params[params.len() - 2], "--set-json");
        assert!(params[params.len() - 1].contains("uyuni-ca-issuer"));
    }

    #[test]
    fn test_no_values_file_flag_without_override() {
        let params = uyuni_helm_params(&image(), &helm_flags(None), "srv.example.com", "", &[]);
        assert!(!params.contains(&"-f".to_string()));
        assert!(params.contains(&"fqdn=srv.example.com".to_string()));
    }
}

//! Install command implementation

use crate::config::flags::{ChartFlags, HelmFlags, ImageFlags, SslCertFlags, TlsCert};
use crate::config::settings::Settings;
use crate::k8s::{ClusterInfos, certs, deploy};
use crate::utils::runner::CmdRunner;
use crate::utils::waiter::RetryPolicy;
use crate::utils::prereqs;
use anyhow::Result;
use std::path::PathBuf;

/// Options for installing on a Kubernetes cluster
#[derive(Debug, Default)]
pub struct InstallKubernetesOptions {
    /// Externally visible host name of the server
    pub fqdn: String,
    pub image: Option<String>,
    pub tag: Option<String>,
    pub chart: Option<String>,
    pub chart_version: Option<String>,
    pub namespace: Option<String>,
    pub values: Option<PathBuf>,
    pub cert_manager_chart: Option<String>,
    pub cert_manager_version: Option<String>,
    pub cert_manager_namespace: Option<String>,
    pub cert_manager_values: Option<PathBuf>,
    pub ssl: SslOptions,
    pub ssl_ca_root: Option<PathBuf>,
    pub ssl_ca_cert: Option<PathBuf>,
    pub ssl_ca_key: Option<PathBuf>,
}

/// Certificate subject fields and issuer switches from the command line
#[derive(Debug, Clone, Default)]
pub struct SslOptions {
    pub use_existing: bool,
    pub country: String,
    pub state: String,
    pub city: String,
    pub org: String,
    pub org_unit: String,
    pub email: String,
}

/// Deploy the server to the current Kubernetes cluster
pub fn kubernetes(runner: &CmdRunner, options: InstallKubernetesOptions) -> Result<()> {
    prereqs::check_all(&prereqs::kubernetes())?;

    let settings = Settings::load();
    let image = ImageFlags::resolve(options.image.clone(), options.tag.clone(), &settings);
    let helm_flags = resolve_helm_flags(&options, &settings);
    let ssl_flags = resolve_ssl_flags(&options);

    let ca = TlsCert::from_files(
        options.ssl_ca_root.as_deref(),
        options.ssl_ca_cert.as_deref(),
        options.ssl_ca_key.as_deref(),
    )?;

    let infos = ClusterInfos::detect(runner)?;
    crate::log_info!("Deploying Uyuni to {}", options.fqdn);

    let policy = RetryPolicy::default();

    // Certificate chain first: the issuer annotation feeds the release
    let helm_args = certs::deploy_certificate(
        runner,
        &policy,
        &helm_flags,
        &ssl_flags,
        &ca,
        infos.kubeconfig(),
    )?;

    deploy::deploy(
        runner,
        &policy,
        &infos,
        &image,
        &helm_flags,
        &options.fqdn,
        &helm_args,
    )?;

    crate::log_info!(
        "Uyuni deployed: point your browser to https://{}",
        options.fqdn
    );
    Ok(())
}

fn resolve_helm_flags(options: &InstallKubernetesOptions, settings: &Settings) -> HelmFlags {
    HelmFlags {
        uyuni: ChartFlags {
            chart: options
                .chart
                .clone()
                .unwrap_or_else(|| settings.helm.chart.clone()),
            version: options
                .chart_version
                .clone()
                .unwrap_or_else(|| settings.helm.version.clone()),
            namespace: options
                .namespace
                .clone()
                .unwrap_or_else(|| settings.helm.namespace.clone()),
            values: options
                .values
                .clone()
                .or_else(|| settings.helm.values.clone().map(PathBuf::from)),
        },
        cert_manager: ChartFlags {
            chart: options
                .cert_manager_chart
                .clone()
                .unwrap_or_else(|| settings.cert_manager.chart.clone()),
            version: options
                .cert_manager_version
                .clone()
                .unwrap_or_else(|| settings.cert_manager.version.clone()),
            namespace: options
                .cert_manager_namespace
                .clone()
                .unwrap_or_else(|| settings.cert_manager.namespace.clone()),
            values: options
                .cert_manager_values
                .clone()
                .or_else(|| settings.cert_manager.values.clone().map(PathBuf::from)),
        },
    }
}

fn resolve_ssl_flags(options: &InstallKubernetesOptions) -> SslCertFlags {
    SslCertFlags {
        use_existing: options.ssl.use_existing,
        country: options.ssl.country.clone(),
        state: options.ssl.state.clone(),
        city: options.ssl.city.clone(),
        org: options.ssl.org.clone(),
        org_unit: options.ssl.org_unit.clone(),
        email: options.ssl.email.clone(),
        fqdn: options.fqdn.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_settings() {
        let options = InstallKubernetesOptions {
            fqdn: "srv.example.com".to_string(),
            namespace: Some("uyuni".to_string()),
            ..Default::default()
        };
        let flags = resolve_helm_flags(&options, &Settings::default());
        assert_eq!(flags.uyuni.namespace, "uyuni");
        // Untouched values fall back to the defaults
        assert_eq!(flags.cert_manager.namespace, "cert-manager");
        assert!(flags.cert_manager.chart.is_empty());
    }

    #[test]
    fn test_fqdn_flows_into_ssl_flags() {
        let options = InstallKubernetesOptions {
            fqdn: "srv.example.com".to_string(),
            ..Default::default()
        };
        let ssl = resolve_ssl_flags(&options);
        assert_eq!(ssl.fqdn, "srv.example.com");
        assert!(!ssl.use_existing);
    }
}

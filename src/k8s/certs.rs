//! cert-manager and certificate issuer bootstrap
//!
//! Brings the certificate chain from absent to extracted in idempotent
//! steps: install the controller only if its webhook is not already ready,
//! apply the issuer, wait for it, then republish the CA certificate in a
//! configmap the server container is allowed to read.

use crate::config::flags::{CERT_MANAGER_CHART, CERT_MANAGER_REPO, ChartFlags, HelmFlags, SslCertFlags, TlsCert};
use crate::k8s::{helm, kubectl};
use crate::templates::issuer::{CA_ISSUER_NAME, IssuerData};
pub use crate::templates::issuer::CA_SECRET_NAME;
use crate::utils::runner::CmdRunner;
use crate::utils::waiter::{self, RetryPolicy};
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Configmap republishing the CA certificate without its key
pub const CA_CONFIGMAP_NAME: &str = "uyuni-ca";
/// Server certificate secret created by the issuer
pub const CERT_SECRET_NAME: &str = "uyuni-cert";

const CA_CRT_JSONPATH: &str = "-o=jsonpath={.data.ca\\.crt}";

/// Set up the certificate chain for the server.
///
/// Returns extra helm parameters binding the server ingress to the issuer,
/// or nothing when existing certificates are to be used as-is.
pub fn deploy_certificate(
    runner: &CmdRunner,
    policy: &RetryPolicy,
    helm_flags: &HelmFlags,
    ssl_flags: &SslCertFlags,
    ca: &TlsCert,
    kubeconfig: Option<&Path>,
) -> Result<Vec<String>> {
    let mut helm_args = Vec::new();
    if ssl_flags.use_existing {
        // The expected secret and configmap are trusted to be in place
        crate::log_info!("Using existing SSL certificate");
    } else {
        helm_args.extend(install_ssl_issuer(
            runner, policy, helm_flags, ssl_flags, ca, kubeconfig,
        )?);
    }

    // The server container must not see the CA key, only its certificate
    extract_ca_cert_to_config(runner)?;

    Ok(helm_args)
}

/// Install cert-manager if needed and create the self-signed CA issuer.
/// Returns the helm parameters making the ingress request its certificate
/// from the issuer.
fn install_ssl_issuer(
    runner: &CmdRunner,
    policy: &RetryPolicy,
    helm_flags: &HelmFlags,
    ssl_flags: &SslCertFlags,
    ca: &TlsCert,
    kubeconfig: Option<&Path>,
) -> Result<Vec<String>> {
    install_cert_manager(runner, policy, &helm_flags.cert_manager, kubeconfig)?;

    crate::log_info!("Creating SSL certificate issuer");

    let issuer = IssuerData {
        namespace: helm_flags.uyuni.namespace.clone(),
        country: ssl_flags.country.clone(),
        state: ssl_flags.state.clone(),
        city: ssl_flags.city.clone(),
        org: ssl_flags.org.clone(),
        org_unit: ssl_flags.org_unit.clone(),
        email: ssl_flags.email.clone(),
        fqdn: ssl_flags.fqdn.clone(),
        root_ca: ca.root_ca.clone(),
        certificate: ca.certificate.clone(),
        key: ca.key.clone(),
    };

    // The rendered manifest holds key material: keep it in a private
    // directory removed on every exit path
    let manifest_dir = tempfile::Builder::new()
        .prefix("uyuniadm-")
        .tempdir()
        .context("Failed to create temporary directory")?;
    let issuer_path = manifest_dir.path().join("issuer.yaml");
    fs::write(&issuer_path, issuer.render()?)
        .context("Failed to write issuer definition")?;

    kubectl::apply_file(runner, &issuer_path, "Failed to create issuer")?;

    if runner.dry_run {
        crate::log_info!("Would wait for issuer {} to be ready", CA_ISSUER_NAME);
    } else {
        waiter::wait_until(policy, &format!("issuer {}", CA_ISSUER_NAME), || {
            issuer_is_ready(runner).then_some(())
        })?;
    }

    Ok(vec![
        "--set-json".to_string(),
        format!(
            "ingressSslAnnotations={{\"cert-manager.io/issuer\": \"{}\"}}",
            CA_ISSUER_NAME
        ),
    ])
}

fn install_cert_manager(
    runner: &CmdRunner,
    policy: &RetryPolicy,
    flags: &ChartFlags,
    kubeconfig: Option<&Path>,
) -> Result<()> {
    if !kubectl::is_deployment_ready(runner, Some(&flags.namespace), "cert-manager") {
        crate::log_info!("Installing cert-manager");

        let labels = format!(
            "global.commonLabels={{\"{}\": \"{}\"}}",
            helm::INSTALLED_BY_LABEL,
            helm::INSTALLED_BY_VALUE
        );
        let values;
        let mut args: Vec<&str> = vec!["--set", "installCRDs=true", "--set-json", &labels];
        if let Some(path) = &flags.values {
            values = path.display().to_string();
            args.extend_from_slice(&["-f", values.as_str()]);
        }

        // Use the upstream chart if nothing is configured
        let mut repo = "";
        let mut chart = flags.chart.as_str();
        if chart.is_empty() {
            repo = CERT_MANAGER_REPO;
            chart = CERT_MANAGER_CHART;
        }

        // The installedby label scopes the uninstall to what we installed
        helm::helm_upgrade(
            runner,
            kubeconfig,
            &flags.namespace,
            true,
            repo,
            "cert-manager",
            chart,
            &flags.version,
            &args,
        )?;
    }

    // Issuer creation goes through the webhook, so wait for it
    kubectl::wait_for_deployment(runner, policy, Some(&flags.namespace), "cert-manager-webhook")
}

#[derive(Deserialize)]
struct IssuerStatus {
    #[serde(default)]
    conditions: Vec<IssuerCondition>,
}

#[derive(Deserialize)]
struct IssuerCondition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

/// Whether any status condition reports Ready/True. Matching on the full
/// condition list keeps additional conditions from masking readiness.
fn conditions_ready(status_json: &str) -> bool {
    let status: IssuerStatus = match serde_json::from_str::<serde_json::Value>(status_json)
        .ok()
        .and_then(|doc| serde_json::from_value(doc.get("status")?.clone()).ok())
    {
        Some(status) => status,
        None => return false,
    };

    status
        .conditions
        .iter()
        .any(|condition| condition.kind == "Ready" && condition.status == "True")
}

fn issuer_is_ready(runner: &CmdRunner) -> bool {
    runner
        .capture_ok("kubectl", &["get", "-o", "json", "issuer", CA_ISSUER_NAME])
        .is_some_and(|out| conditions_ready(&out))
}

/// Republish the CA certificate as the uyuni-ca configmap.
///
/// A no-op when the configmap already holds the certificate, so re-running
/// the deploy pipeline never duplicates it.
pub fn extract_ca_cert_to_config(runner: &CmdRunner) -> Result<()> {
    crate::log_info!("Extracting the CA certificate to a configmap");

    let existing = runner.capture_ok(
        "kubectl",
        &["get", "configmap", CA_CONFIGMAP_NAME, CA_CRT_JSONPATH],
    );
    if existing.is_some_and(|out| !out.is_empty()) {
        crate::log_info!(
            "{} configmap already existing, skipping extraction",
            CA_CONFIGMAP_NAME
        );
        return Ok(());
    }

    let encoded = match runner.capture(
        "kubectl",
        &["get", "secret", CA_SECRET_NAME, CA_CRT_JSONPATH],
        "Failed to get the CA certificate",
    ) {
        Ok(encoded) => encoded,
        // The secret only appears once the issuer ran, which a dry run
        // never does
        Err(_) if runner.dry_run => {
            crate::log_info!(
                "Would create configmap {} from the {} secret",
                CA_CONFIGMAP_NAME,
                CA_SECRET_NAME
            );
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let decoded = STANDARD
        .decode(encoded.as_bytes())
        .context("Failed to base64 decode the CA certificate")?;
    let certificate =
        String::from_utf8(decoded).context("CA certificate is not valid UTF-8")?;

    let literal = format!("--from-literal=ca.crt={}", certificate);
    runner.run(
        "kubectl",
        &["create", "configmap", CA_CONFIGMAP_NAME, &literal],
        "Failed to create the CA configmap",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_ready_condition() {
        let json = r#"{"status": {"conditions": [{"type": "Ready", "status": "True"}]}}"#;
        assert!(conditions_ready(json));
    }

    #[test]
    fn test_ready_among_multiple_conditions() {
        // Extra conditions must not mask readiness
        let json = r#"{"status": {"conditions": [
            {"type": "Issuing", "status": "False"},
            {"type": "Ready", "status": "True"}
        ]}}"#;
        assert!(conditions_ready(json));
    }

    #[test]
    fn test_ready_false_is_not_ready() {
        let json = r#"{"status": {"conditions": [{"type": "Ready", "status": "False"}]}}"#;
        assert!(!conditions_ready(json));
    }

    #[test]
    fn test_missing_status_is_not_ready() {
        assert!(!conditions_ready(r#"{"metadata": {"name": "uyuni-ca-issuer"}}"#));
        assert!(!conditions_ready("not even json"));
    }

    #[test]
    fn test_issuer_annotation_parameter() {
        // The annotation is the contract between issuer bootstrap and the
        // release upgrade call
        let expected = r#"ingressSslAnnotations={"cert-manager.io/issuer": "uyuni-ca-issuer"}"#;
        let rendered = format!(
            "ingressSslAnnotations={{\"cert-manager.io/issuer\": \"{}\"}}",
            CA_ISSUER_NAME
        );
        assert_eq!(rendered, expected);
    }
}

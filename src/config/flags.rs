//! Effective parameter sets for the deployment pipelines
//!
//! Resolution order for every value: command line flag, then configuration
//! file, then built-in default.

use crate::config::settings::Settings;
use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::{Path, PathBuf};

/// Upstream chart used when no cert-manager chart is configured
pub const CERT_MANAGER_REPO: &str = "https://charts.jetstack.io";
pub const CERT_MANAGER_CHART: &str = "cert-manager";

/// Server container image reference
#[derive(Debug, Clone)]
pub struct ImageFlags {
    pub name: String,
    pub tag: String,
}

impl ImageFlags {
    pub fn resolve(name: Option<String>, tag: Option<String>, settings: &Settings) -> Self {
        Self {
            name: name.unwrap_or_else(|| settings.image.name.clone()),
            tag: tag.unwrap_or_else(|| settings.image.tag.clone()),
        }
    }

    pub fn reference(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }
}

/// Chart coordinates for one releasable component
#[derive(Debug, Clone)]
pub struct ChartFlags {
    pub chart: String,
    /// Empty means the latest published version
    pub version: String,
    pub namespace: String,
    pub values: Option<PathBuf>,
}

/// Chart coordinates for everything the install pipeline may release
#[derive(Debug, Clone)]
pub struct HelmFlags {
    pub uyuni: ChartFlags,
    pub cert_manager: ChartFlags,
}

/// Certificate subject data and issuer behavior switches
#[derive(Debug, Clone, Default)]
pub struct SslCertFlags {
    /// Skip the issuer bootstrap and trust the existing secret and configmap
    pub use_existing: bool,
    pub country: String,
    pub state: String,
    pub city: String,
    pub org: String,
    pub org_unit: String,
    pub email: String,
    pub fqdn: String,
}

/// CA material fed into issuer creation, base64 encoded.
///
/// All fields empty means a self-signed CA gets generated by cert-manager.
#[derive(Debug, Clone, Default)]
pub struct TlsCert {
    pub root_ca: String,
    pub certificate: String,
    pub key: String,
}

impl TlsCert {
    pub fn is_empty(&self) -> bool {
        self.root_ca.is_empty() && self.certificate.is_empty() && self.key.is_empty()
    }

    /// Read and encode CA material from local files, or return the empty
    /// value when no file was given
    pub fn from_files(
        root_ca: Option<&Path>,
        certificate: Option<&Path>,
        key: Option<&Path>,
    ) -> Result<Self> {
        match (root_ca, certificate, key) {
            (None, None, None) => Ok(Self::default()),
            (Some(root_ca), Some(certificate), Some(key)) => Ok(Self {
                root_ca: read_encoded(root_ca)?,
                certificate: read_encoded(certificate)?,
                key: read_encoded(key)?,
            }),
            _ => Err(anyhow!(
                "CA root certificate, server certificate and key must all be provided together"
            )),
        }
    }
}

fn read_encoded(path: &Path) -> Result<String> {
    let content =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(STANDARD.encode(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_image_flag_precedence() {
        let settings = Settings::default();
        let image = ImageFlags::resolve(Some("registry.example.com/uyuni".into()), None, &settings);
        assert_eq!(image.name, "registry.example.com/uyuni");
        assert_eq!(image.tag, "latest");
        assert_eq!(image.reference(), "registry.example.com/uyuni:latest");
    }

    #[test]
    fn test_tls_cert_requires_all_files() {
        let result = TlsCert::from_files(Some(Path::new("/tmp/ca.crt")), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_tls_cert_reads_and_encodes() {
        let mut ca = tempfile::NamedTempFile::new().unwrap();
        ca.write_all(b"CA PEM").unwrap();
        let mut crt = tempfile::NamedTempFile::new().unwrap();
        crt.write_all(b"CRT PEM").unwrap();
        let mut key = tempfile::NamedTempFile::new().unwrap();
        key.write_all(b"KEY PEM").unwrap();

        let cert = TlsCert::from_files(Some(ca.path()), Some(crt.path()), Some(key.path())).unwrap();
        assert!(!cert.is_empty());
        assert_eq!(STANDARD.decode(&cert.root_ca).unwrap(), b"CA PEM");
    }

    #[test]
    fn test_tls_cert_empty_by_default() {
        assert!(TlsCert::from_files(None, None, None).unwrap().is_empty());
    }
}

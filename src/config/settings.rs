//! Configuration file support for uyuni-adm

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub image: ImageSettings,

    #[serde(default)]
    pub helm: HelmSettings,

    #[serde(default)]
    pub cert_manager: CertManagerSettings,
}

/// Server container image defaults
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ImageSettings {
    #[serde(default = "default_image_name")]
    pub name: String,

    #[serde(default = "default_image_tag")]
    pub tag: String,
}

/// Uyuni helm chart defaults
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HelmSettings {
    #[serde(default = "default_chart")]
    pub chart: String,

    /// Empty means the latest published chart version
    #[serde(default)]
    pub version: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Optional values file applied to the uyuni release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
}

/// cert-manager chart defaults
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CertManagerSettings {
    /// Empty means the upstream jetstack chart
    #[serde(default)]
    pub chart: String,

    #[serde(default)]
    pub version: String,

    #[serde(default = "default_cert_manager_namespace")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
}

fn default_image_name() -> String {
    "registry.opensuse.org/uyuni/server".to_string()
}

fn default_image_tag() -> String {
    "latest".to_string()
}

fn default_chart() -> String {
    "oci://registry.opensuse.org/uyuni/server-helm".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_cert_manager_namespace() -> String {
    "cert-manager".to_string()
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            name: default_image_name(),
            tag: default_image_tag(),
        }
    }
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            chart: default_chart(),
            version: String::new(),
            namespace: default_namespace(),
            values: None,
        }
    }
}

impl Default for CertManagerSettings {
    fn default() -> Self {
        Self {
            chart: String::new(),
            version: String::new(),
            namespace: default_cert_manager_namespace(),
            values: None,
        }
    }
}

impl Settings {
    /// Load settings from file or return defaults
    pub fn load() -> Self {
        if let Some(path) = Self::find_config_file() {
            Self::load_from_file(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .uyuni-adm.toml in current directory
    /// 2. ~/.config/uyuni-adm/config.toml (XDG config directory)
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(".uyuni-adm.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("uyuni-adm").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.image.name, "registry.opensuse.org/uyuni/server");
        assert_eq!(settings.image.tag, "latest");
        assert_eq!(settings.helm.namespace, "default");
        assert!(settings.helm.version.is_empty());
        assert!(settings.cert_manager.chart.is_empty());
        assert_eq!(settings.cert_manager.namespace, "cert-manager");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[image]\ntag = \"2024.07\"\n\n[helm]\nnamespace = \"uyuni\"\n"
        )
        .unwrap();

        let settings = Settings::load_from_file(&file.path().to_path_buf()).unwrap();
        assert_eq!(settings.image.tag, "2024.07");
        assert_eq!(settings.image.name, "registry.opensuse.org/uyuni/server");
        assert_eq!(settings.helm.namespace, "uyuni");
        assert_eq!(settings.helm.chart, default_chart());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "image = \"not a table\"").unwrap();

        assert!(Settings::load_from_file(&file.path().to_path_buf()).is_err());
    }
}

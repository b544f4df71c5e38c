//! Migrate command implementation
//!
//! Pulls the data of a legacy non-containerized installation into the
//! running server by rendering the migration script, pushing it into the
//! container and executing it there.

use crate::config::SERVER_VOLUMES;
use crate::templates::MigrateScriptData;
use crate::utils::copy::{self, Backend, Location};
use crate::utils::runner::CmdRunner;
use crate::utils::prereqs;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;

/// In-container path the script is installed to before running
const SCRIPT_PATH: &str = "server:/var/lib/uyuni-tools/migrate.sh";

pub fn migrate(runner: &CmdRunner, source_fqdn: &str, backend: Option<Backend>) -> Result<()> {
    let backend = match backend {
        Some(backend) => backend,
        None => Backend::detect(runner)?,
    };
    match backend {
        Backend::Kubectl => prereqs::check_all(&prereqs::kubernetes())?,
        Backend::Podman | Backend::PodmanRemote => prereqs::check_all(&prereqs::podman())?,
    }

    crate::log_info!("Migrating {} via {}", source_fqdn, backend);

    let data = MigrateScriptData {
        volumes: BTreeMap::from_iter(
            SERVER_VOLUMES
                .iter()
                .map(|(name, path)| (name.to_string(), path.to_string())),
        ),
        source_fqdn: source_fqdn.to_string(),
        kubernetes: backend == Backend::Kubectl,
    };

    let script_dir = tempfile::Builder::new()
        .prefix("uyuniadm-")
        .tempdir()
        .context("Failed to create temporary directory")?;
    let local_path = script_dir.path().join("migrate.sh");
    fs::write(&local_path, data.render()?).context("Failed to write migration script")?;

    let destination = Location::parse(SCRIPT_PATH);
    copy::copy(
        runner,
        backend,
        &Location::Local(local_path),
        &destination,
        Some("root"),
        Some("root"),
    )?;

    let pod = backend.pod_name(runner)?;
    let script = destination.path().display().to_string();
    backend.exec(
        runner,
        &pod,
        &["sh", &script],
        "Migration script failed",
    )?;

    crate::log_info!("Migration from {} finished", source_fqdn);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_destination_is_in_container() {
        let destination = Location::parse(SCRIPT_PATH);
        assert!(destination.is_server());
        assert_eq!(
            destination.path().display().to_string(),
            "/var/lib/uyuni-tools/migrate.sh"
        );
    }

    #[test]
    fn test_server_volumes_feed_the_script() {
        let volumes: BTreeMap<String, String> = BTreeMap::from_iter(
            SERVER_VOLUMES
                .iter()
                .map(|(name, path)| (name.to_string(), path.to_string())),
        );
        let data = MigrateScriptData {
            volumes,
            source_fqdn: "old.example.com".to_string(),
            kubernetes: false,
        };
        let script = data.render().unwrap();
        assert!(script.contains("/var/lib/pgsql"));
        assert!(script.contains("/etc/rhn"));
    }
}

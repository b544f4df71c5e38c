//! Migration script rendering
//!
//! The script runs inside the server container and pulls the data of a
//! legacy non-containerized installation over ssh.

use anyhow::{Result, anyhow};
use std::collections::BTreeMap;

/// Parameters of the migration script
#[derive(Debug, Clone, Default)]
pub struct MigrateScriptData {
    /// Volume name to mount path mapping; the mount paths get synced
    pub volumes: BTreeMap<String, String>,
    /// Host name of the legacy installation to pull from
    pub source_fqdn: String,
    /// Whether the target runs on Kubernetes rather than podman
    pub kubernetes: bool,
}

impl MigrateScriptData {
    pub fn render(&self) -> Result<String> {
        if self.source_fqdn.is_empty() {
            return Err(anyhow!("Migration script requires the source FQDN"));
        }
        if self.volumes.is_empty() {
            return Err(anyhow!("Migration script requires at least one volume"));
        }

        let folders = self
            .volumes
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        let mut script = format!(
            r#"#!/bin/bash
set -e
for folder in {folders};
do
  echo "Copying $folder..."
  rsync -e "ssh -A " --rsync-path='sudo rsync' -avz {fqdn}:$folder/ $folder;
done;
rm -f /srv/www/htdocs/pub/RHN-ORG-TRUSTED-SSL-CERT;
ln -s /etc/pki/trust/anchors/LOCAL-RHN-ORG-TRUSTED-SSL-CERT /srv/www/htdocs/pub/RHN-ORG-TRUSTED-SSL-CERT;

echo "Extracting time zone..."
ssh {fqdn} timedatectl show -p Timezone >/var/lib/uyuni-tools/data
"#,
            folders = folders,
            fqdn = self.source_fqdn,
        );

        if self.kubernetes {
            script.push_str(&format!(
                r#"
echo "Altering configuration for kubernetes..."
echo 'server.no_ssl = 1' >> /etc/rhn/rhn.conf;
sed 's/address=[^:]*:/address=*:/' -i /etc/rhn/taskomatic.conf;

if test ! -f /etc/tomcat/conf.d/remote_debug.conf -a -f /etc/sysconfig/tomcat; then
  mv /etc/sysconfig/tomcat /etc/tomcat/conf.d/remote_debug.conf
fi

sed 's/address=[^:]*:/address=*:/' -i /etc/tomcat/conf.d/remote_debug.conf

if test -d /root/ssl-build; then
  echo "Extracting SSL CA certificate..."
  cp /root/ssl-build/RHN-ORG-TRUSTED-SSL-CERT /var/lib/uyuni-tools/
  cp /root/ssl-build/RHN-ORG-PRIVATE-SSL-KEY /var/lib/uyuni-tools/
else
  echo "Extracting SSL certificate..."
  scp -A {fqdn}:/etc/pki/tls/private/spacewalk.key /var/lib/uyuni-tools/
  scp -A {fqdn}:/etc/pki/tls/certs/spacewalk.crt /var/lib/uyuni-tools/
fi
"#,
                fqdn = self.source_fqdn,
            ));
        }

        script.push_str("echo \"DONE\"\n");
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(kubernetes: bool) -> MigrateScriptData {
        MigrateScriptData {
            volumes: BTreeMap::from([("var-lib-app".to_string(), "/var/lib/app".to_string())]),
            source_fqdn: "old.example.com".to_string(),
            kubernetes,
        }
    }

    #[test]
    fn test_sync_line_per_volume() {
        let script = data(false).render().unwrap();
        assert!(script.contains("for folder in /var/lib/app;"));
        assert!(script.contains("old.example.com:$folder/ $folder"));
        assert!(script.contains("LOCAL-RHN-ORG-TRUSTED-SSL-CERT"));
    }

    #[test]
    fn test_kubernetes_edits_present_when_targeting_cluster() {
        let script = data(true).render().unwrap();
        assert!(script.contains("server.no_ssl = 1"));
        assert!(script.contains("taskomatic.conf"));
        assert!(script.contains("remote_debug.conf"));
        assert!(script.contains("old.example.com:/etc/pki/tls/private/spacewalk.key"));
    }

    #[test]
    fn test_kubernetes_edits_absent_for_podman_target() {
        let script = data(false).render().unwrap();
        assert!(!script.contains("server.no_ssl"));
        assert!(!script.contains("taskomatic.conf"));
        assert!(script.ends_with("echo \"DONE\"\n"));
    }

    #[test]
    fn test_volumes_sync_in_stable_order() {
        let mut data = data(false);
        data.volumes
            .insert("etc-rhn".to_string(), "/etc/rhn".to_string());
        let script = data.render().unwrap();
        assert!(script.contains("for folder in /etc/rhn /var/lib/app;"));
    }

    #[test]
    fn test_missing_fields_are_fatal() {
        let mut no_fqdn = data(false);
        no_fqdn.source_fqdn.clear();
        assert!(no_fqdn.render().is_err());

        let mut no_volumes = data(false);
        no_volumes.volumes.clear();
        assert!(no_volumes.render().is_err());
    }
}

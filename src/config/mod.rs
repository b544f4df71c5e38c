//! Configuration and effective parameter sets

pub mod flags;
pub mod settings;

pub use flags::{ChartFlags, HelmFlags, ImageFlags, SslCertFlags, TlsCert};
pub use settings::Settings;

/// Persistent volumes backing the server, as (name, mount path) pairs.
/// The migration script syncs the mount paths from the legacy installation.
pub const SERVER_VOLUMES: &[(&str, &str)] = &[
    ("var-cobbler", "/var/lib/cobbler"),
    ("var-pgsql", "/var/lib/pgsql"),
    ("var-cache", "/var/cache"),
    ("var-spacewalk", "/var/spacewalk"),
    ("var-log", "/var/log"),
    ("srv-salt", "/srv/salt"),
    ("srv-www", "/srv/www"),
    ("srv-tftpboot", "/srv/tftpboot"),
    ("srv-formulametadata", "/srv/formula_metadata"),
    ("srv-pillar", "/srv/pillar"),
    ("srv-susemanager", "/srv/susemanager"),
    ("srv-spacewalk", "/srv/spacewalk"),
    ("root", "/root"),
    ("etc-apache2", "/etc/apache2"),
    ("etc-rhn", "/etc/rhn"),
    ("etc-systemd-multi", "/etc/systemd/system/multi-user.target.wants"),
    ("etc-systemd-sockets", "/etc/systemd/system/sockets.target.wants"),
    ("etc-salt", "/etc/salt"),
    ("etc-tomcat", "/etc/tomcat"),
    ("etc-cobbler", "/etc/cobbler"),
    ("etc-sysconfig", "/etc/sysconfig"),
    ("etc-tls", "/etc/pki/tls"),
    ("ca-cert", "/etc/pki/trust/anchors"),
];

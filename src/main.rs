//! uyuniadm CLI - deployment lifecycle tool for the Uyuni server

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use uyuni_adm::commands;
use uyuni_adm::commands::install::{InstallKubernetesOptions, SslOptions};
use uyuni_adm::utils::{Backend, CmdRunner};

#[derive(Parser)]
#[command(name = "uyuniadm")]
#[command(author, version, about = "Install, migrate and remove the Uyuni server", long_about = None)]
struct Cli {
    /// Verbose output (can be used multiple times: -v, -vv)
    /// default: INFO, -v: DEBUG, -vv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Show the commands that would run without executing them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the Uyuni server
    Install {
        #[command(subcommand)]
        command: InstallCommands,
    },

    /// Remove the Uyuni server and its resources
    Uninstall {
        #[command(subcommand)]
        command: UninstallCommands,
    },

    /// Pull the data of a legacy installation into the running server
    Migrate {
        /// Host name of the legacy installation to pull from
        source_fqdn: String,

        /// Backend hosting the server (detected when omitted)
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum InstallCommands {
    /// Install on the current Kubernetes cluster
    Kubernetes {
        /// Externally visible host name of the server
        #[arg(long)]
        fqdn: String,

        /// Server container image
        #[arg(long)]
        image: Option<String>,

        /// Server container image tag
        #[arg(long)]
        tag: Option<String>,

        /// Uyuni helm chart
        #[arg(long)]
        chart: Option<String>,

        /// Uyuni helm chart version
        #[arg(long)]
        chart_version: Option<String>,

        /// Namespace to install the server in
        #[arg(short, long)]
        namespace: Option<String>,

        /// Values file applied to the uyuni release
        #[arg(long)]
        values: Option<PathBuf>,

        /// cert-manager helm chart (defaults to the upstream chart)
        #[arg(long)]
        cert_manager_chart: Option<String>,

        /// cert-manager helm chart version
        #[arg(long)]
        cert_manager_version: Option<String>,

        /// Namespace to install cert-manager in
        #[arg(long)]
        cert_manager_namespace: Option<String>,

        /// Values file applied to the cert-manager release
        #[arg(long)]
        cert_manager_values: Option<PathBuf>,

        /// Use the SSL secret and CA configmap already in the cluster
        #[arg(long)]
        ssl_use_existing: bool,

        /// SSL certificate country code
        #[arg(long, default_value = "DE")]
        ssl_country: String,

        /// SSL certificate state
        #[arg(long, default_value = "Bayern")]
        ssl_state: String,

        /// SSL certificate city
        #[arg(long, default_value = "Nuernberg")]
        ssl_city: String,

        /// SSL certificate organization
        #[arg(long, default_value = "Uyuni")]
        ssl_org: String,

        /// SSL certificate organization unit
        #[arg(long, default_value = "Uyuni")]
        ssl_org_unit: String,

        /// SSL certificate e-mail address
        #[arg(long, default_value = "")]
        ssl_email: String,

        /// Root CA certificate to issue from instead of generating one
        #[arg(long, requires = "ssl_ca_cert", requires = "ssl_ca_key")]
        ssl_ca_root: Option<PathBuf>,

        /// Intermediate CA certificate
        #[arg(long)]
        ssl_ca_cert: Option<PathBuf>,

        /// Intermediate CA key
        #[arg(long)]
        ssl_ca_key: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum UninstallCommands {
    /// Remove the server from the current Kubernetes cluster
    Kubernetes {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove the podman server container
    Podman {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Also remove the server data volumes
        #[arg(long)]
        purge_volumes: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Podman,
    PodmanRemote,
    Kubernetes,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Podman => Backend::Podman,
            BackendArg::PodmanRemote => Backend::PodmanRemote,
            BackendArg::Kubernetes => Backend::Kubectl,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let runner = CmdRunner::new(cli.verbose > 0, cli.dry_run);
    if cli.dry_run {
        uyuni_adm::log_info!("Dry run: no changes will be made");
    }

    match cli.command {
        Commands::Install { command } => handle_install_command(&runner, command),
        Commands::Uninstall { command } => handle_uninstall_command(&runner, command),
        Commands::Migrate {
            source_fqdn,
            backend,
        } => commands::migrate::migrate(&runner, &source_fqdn, backend.map(Backend::from)),
        Commands::Completion { shell } => handle_completion_command(shell),
        Commands::Version => handle_version_command(),
    }
}

fn handle_install_command(runner: &CmdRunner, command: InstallCommands) -> Result<()> {
    match command {
        InstallCommands::Kubernetes {
            fqdn,
            image,
            tag,
            chart,
            chart_version,
            namespace,
            values,
            cert_manager_chart,
            cert_manager_version,
            cert_manager_namespace,
            cert_manager_values,
            ssl_use_existing,
            ssl_country,
            ssl_state,
            ssl_city,
            ssl_org,
            ssl_org_unit,
            ssl_email,
            ssl_ca_root,
            ssl_ca_cert,
            ssl_ca_key,
        } => commands::install::kubernetes(
            runner,
            InstallKubernetesOptions {
                fqdn,
                image,
                tag,
                chart,
                chart_version,
                namespace,
                values,
                cert_manager_chart,
                cert_manager_version,
                cert_manager_namespace,
                cert_manager_values,
                ssl: SslOptions {
                    use_existing: ssl_use_existing,
                    country: ssl_country,
                    state: ssl_state,
                    city: ssl_city,
                    org: ssl_org,
                    org_unit: ssl_org_unit,
                    email: ssl_email,
                },
                ssl_ca_root,
                ssl_ca_cert,
                ssl_ca_key,
            },
        ),
    }
}

fn handle_uninstall_command(runner: &CmdRunner, command: UninstallCommands) -> Result<()> {
    match command {
        UninstallCommands::Kubernetes { yes } => commands::uninstall::kubernetes(runner, yes),
        UninstallCommands::Podman { yes, purge_volumes } => {
            commands::uninstall::podman(runner, yes, purge_volumes)
        }
    }
}

fn handle_completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "uyuniadm", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> Result<()> {
    println!("uyuniadm {}", env!("CARGO_PKG_VERSION"));
    println!("Deployment lifecycle tool for the Uyuni server");
    Ok(())
}

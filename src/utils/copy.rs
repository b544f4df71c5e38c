//! File transfer in and out of the running server container
//!
//! Paths inside the server are written with a `server:` prefix on the
//! command line. That sentinel is parsed once, at the boundary, into a
//! typed [`Location`]; only the backend call translates it to the concrete
//! container or pod identity.

use crate::utils::runner::CmdRunner;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Name of the server container started by the podman backend
pub const PODMAN_CONTAINER: &str = "uyuni-server";
/// Label selecting the server pod on Kubernetes
pub const POD_LABEL: &str = "app=uyuni";
/// Container to pin inside the server pod for kubectl cp/exec
pub const POD_CONTAINER: &str = "uyuni";

/// Which command family talks to the running server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Podman,
    PodmanRemote,
    Kubectl,
}

impl Backend {
    pub fn command(&self) -> &'static str {
        match self {
            Backend::Podman => "podman",
            Backend::PodmanRemote => "podman-remote",
            Backend::Kubectl => "kubectl",
        }
    }

    /// Find the backend hosting the server by probing for it live
    pub fn detect(runner: &CmdRunner) -> Result<Self> {
        let pod = runner.capture_ok(
            "kubectl",
            &["get", "pod", "-l", POD_LABEL, "-o", "jsonpath={.items[*].metadata.name}"],
        );
        if pod.is_some_and(|out| !out.is_empty()) {
            return Ok(Backend::Kubectl);
        }

        let container = runner.capture_ok(
            "podman",
            &["ps", "-q", "-f", &format!("name={}", PODMAN_CONTAINER)],
        );
        if container.is_some_and(|out| !out.is_empty()) {
            return Ok(Backend::Podman);
        }

        Err(anyhow!(
            "No running Uyuni server found: neither a pod labelled {} nor a {} container",
            POD_LABEL,
            PODMAN_CONTAINER
        ))
    }

    /// Resolve the concrete container or pod name of the running server
    pub fn pod_name(&self, runner: &CmdRunner) -> Result<String> {
        match self {
            Backend::Podman | Backend::PodmanRemote => {
                let out = runner.capture(
                    self.command(),
                    &["ps", "-q", "-f", &format!("name={}", PODMAN_CONTAINER)],
                    "Failed to query the server container",
                )?;
                if out.is_empty() {
                    return Err(anyhow!("Container {} is not running", PODMAN_CONTAINER));
                }
                Ok(PODMAN_CONTAINER.to_string())
            }
            Backend::Kubectl => {
                let out = runner.capture(
                    "kubectl",
                    &[
                        "get",
                        "pod",
                        "-l",
                        POD_LABEL,
                        "-o",
                        "jsonpath={.items[0].metadata.name}",
                    ],
                    "Failed to find the server pod",
                )?;
                if out.is_empty() {
                    return Err(anyhow!("No pod labelled {} found", POD_LABEL));
                }
                Ok(out)
            }
        }
    }

    /// Execute a command inside the running server
    pub fn exec(
        &self,
        runner: &CmdRunner,
        pod: &str,
        command: &[&str],
        failure_msg: &str,
    ) -> Result<()> {
        let mut args = vec!["exec", pod];
        if *self == Backend::Kubectl {
            args.extend_from_slice(&["-c", POD_CONTAINER, "--"]);
        }
        args.extend_from_slice(command);
        runner.run(self.command(), &args, failure_msg)
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// A path on the host or inside the running server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Server(PathBuf),
}

impl Location {
    /// Parse the `server:` sentinel once at the boundary
    pub fn parse(spec: &str) -> Self {
        match spec.strip_prefix("server:") {
            Some(path) => Location::Server(PathBuf::from(path)),
            None => Location::Local(PathBuf::from(spec)),
        }
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Location::Server(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            Location::Local(path) | Location::Server(path) => path,
        }
    }

    /// Translate to the argument the backend CLI expects, binding server
    /// paths to the concrete container or pod name
    pub fn resolve(&self, pod: &str) -> String {
        match self {
            Location::Local(path) => path.display().to_string(),
            Location::Server(path) => format!("{}:{}", pod, path.display()),
        }
    }
}

/// Transfer a file to or from the server container.
///
/// `user` and `group` set the owner of a file transferred into the server;
/// the ownership change runs inside the container against the bare path.
pub fn copy(
    runner: &CmdRunner,
    backend: Backend,
    src: &Location,
    dst: &Location,
    user: Option<&str>,
    group: Option<&str>,
) -> Result<()> {
    let pod = backend.pod_name(runner)?;
    let src_arg = src.resolve(&pod);
    let dst_arg = dst.resolve(&pod);

    let mut args = vec!["cp"];
    if backend == Backend::Kubectl {
        args.extend_from_slice(&["-c", POD_CONTAINER]);
    }
    args.push(&src_arg);
    args.push(&dst_arg);

    runner.run(backend.command(), &args, "Failed to copy file")?;

    if let Some(user) = user {
        if dst.is_server() {
            let owner = match group {
                Some(group) => format!("{}:{}", user, group),
                None => user.to_string(),
            };
            let dst_path = dst.path().display().to_string();
            backend.exec(
                runner,
                &pod,
                &["chown", &owner, &dst_path],
                "Failed to change file owner",
            )?;
        }
    }

    Ok(())
}

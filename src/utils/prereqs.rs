//! Prerequisite checks for the external command surface

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrereqError {
    #[error("Required tool '{name}' not found. {hint}")]
    NotFound { name: String, hint: String },
}

/// A command that must be present on the PATH before a pipeline starts
pub struct CommandPrereq {
    pub name: String,
    pub hint: String,
}

impl CommandPrereq {
    pub fn new(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hint: hint.into(),
        }
    }

    pub fn check(&self) -> Result<(), PrereqError> {
        which::which(&self.name).map_err(|_| PrereqError::NotFound {
            name: self.name.clone(),
            hint: self.hint.clone(),
        })?;
        Ok(())
    }
}

/// Check every prerequisite, failing on the first missing tool
pub fn check_all(prereqs: &[CommandPrereq]) -> Result<(), PrereqError> {
    for prereq in prereqs {
        prereq.check()?;
    }
    Ok(())
}

/// Tools needed by the Kubernetes pipelines
pub fn kubernetes() -> Vec<CommandPrereq> {
    vec![
        CommandPrereq::new(
            "kubectl",
            "Install from: https://kubernetes.io/docs/tasks/tools/",
        ),
        CommandPrereq::new("helm", "Install from: https://helm.sh/docs/intro/install/"),
    ]
}

/// Tools needed by the podman pipelines
pub fn podman() -> Vec<CommandPrereq> {
    vec![CommandPrereq::new(
        "podman",
        "Install from: https://podman.io/getting-started/installation",
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_names_it() {
        let prereq = CommandPrereq::new("uyuni-adm-no-such-tool", "install it somehow");
        let err = prereq.check().unwrap_err();
        assert!(format!("{}", err).contains("uyuni-adm-no-such-tool"));
    }

    #[test]
    fn test_present_tool_passes() {
        // sh exists on any platform these pipelines run on
        let prereq = CommandPrereq::new("sh", "part of the base system");
        assert!(prereq.check().is_ok());
    }

    #[test]
    fn test_check_all_stops_at_first_missing() {
        let prereqs = vec![
            CommandPrereq::new("sh", ""),
            CommandPrereq::new("uyuni-adm-no-such-tool", ""),
        ];
        assert!(check_all(&prereqs).is_err());
    }
}

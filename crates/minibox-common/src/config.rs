//! Container configuration model.
//!
//! Every host path and limit the bootstrap sequence touches lives in
//! [`ContainerConfig`]. The defaults reproduce the single fixed container;
//! a JSON file can override any field so separate instances can use
//! separate roots and cgroup groups.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CGROUP_V1_PATH, CONTAINER_CGROUP_DIR, DEFAULT_CGROUP_NAME, DEFAULT_HOSTNAME,
    DEFAULT_ROOTFS_DIR, MAX_HOSTNAME_LEN,
};
use crate::error::{MiniboxError, Result};
use crate::types::CgroupLimit;

/// Everything the Bootstrapper and Resource-Limit Manager need to know
/// about the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Hostname set inside the UTS namespace.
    pub hostname: String,
    /// Host directory that becomes `/` inside the container.
    pub rootfs: PathBuf,
    /// Host mount point of the cgroup controller hierarchies.
    pub cgroup_mount: PathBuf,
    /// Subgroup created beneath each controller for this container.
    pub cgroup_name: String,
    /// Limits applied, in order, one per controller.
    pub limits: Vec<CgroupLimit>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            rootfs: PathBuf::from(DEFAULT_ROOTFS_DIR),
            cgroup_mount: PathBuf::from(CGROUP_V1_PATH),
            cgroup_name: DEFAULT_CGROUP_NAME.to_string(),
            limits: CgroupLimit::defaults(),
        }
    }
}

impl ContainerConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// Fields missing from the file keep their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| MiniboxError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Returns the configuration at `path`, or the validated defaults when
    /// no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if loading or validation fails.
    pub fn from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Checks the configuration for values the kernel would reject or that
    /// would escape the intended directories.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.hostname.is_empty() {
            return Err(invalid("hostname must not be empty"));
        }
        if self.hostname.len() > MAX_HOSTNAME_LEN {
            return Err(invalid(format!(
                "hostname is {} bytes, at most {MAX_HOSTNAME_LEN} allowed",
                self.hostname.len()
            )));
        }
        if !self.rootfs.is_absolute() {
            return Err(invalid(format!(
                "rootfs must be an absolute path: {}",
                self.rootfs.display()
            )));
        }
        if !self.cgroup_mount.is_absolute() {
            return Err(invalid(format!(
                "cgroup_mount must be an absolute path: {}",
                self.cgroup_mount.display()
            )));
        }
        require_single_component("cgroup_name", &self.cgroup_name)?;

        if self.limits.is_empty() {
            return Err(invalid("at least one cgroup limit is required"));
        }
        let mut seen = HashSet::new();
        for limit in &self.limits {
            require_single_component("subsystem", &limit.subsystem)?;
            require_single_component("control_file", &limit.control_file)?;
            if limit.value.trim().is_empty() {
                return Err(invalid(format!("limit {limit} has an empty value")));
            }
            if !seen.insert(limit.subsystem.as_str()) {
                return Err(invalid(format!(
                    "subsystem {} is limited more than once",
                    limit.subsystem
                )));
            }
        }
        Ok(())
    }

    /// Host directory of this container's group under `subsystem`.
    #[must_use]
    pub fn group_dir(&self, subsystem: &str) -> PathBuf {
        self.cgroup_mount.join(subsystem).join(&self.cgroup_name)
    }

    /// Host path, inside the rootfs, where `subsystem` is bind-mounted.
    #[must_use]
    pub fn bind_target(&self, subsystem: &str) -> PathBuf {
        self.rootfs.join(CONTAINER_CGROUP_DIR).join(subsystem)
    }
}

fn invalid(message: impl Into<String>) -> MiniboxError {
    MiniboxError::Config {
        message: message.into(),
    }
}

fn require_single_component(field: &str, value: &str) -> Result<()> {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid(format!(
            "{field} must be a single path component, got {value:?}"
        ))),
    }
}

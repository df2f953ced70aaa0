//! Cgroups v1 resource management.
//!
//! Applies the configured limits to the container's group under each
//! controller, moves the calling process into those groups, and exposes the
//! groups inside the container root through bind mounts.

pub mod control;

use std::path::PathBuf;

use minibox_common::config::ContainerConfig;
use minibox_common::constants::{CGROUP_PROCS_FILE, NOTIFY_ON_RELEASE_FILE};
use minibox_common::error::Result;
use minibox_common::types::CgroupLimit;
use nix::unistd::Pid;

use crate::filesystem::mount::MountRecord;

/// One controller's group for this container.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Group {
    limit: CgroupLimit,
    /// Host directory of the group.
    dir: PathBuf,
    /// Where the group is bind-mounted inside the container root.
    bind_target: PathBuf,
}

/// Handle to the container's cgroups across all configured controllers.
#[derive(Debug, Clone)]
pub struct CgroupManager {
    groups: Vec<Group>,
}

impl CgroupManager {
    /// Resolves the group directories and bind targets for `config`.
    #[must_use]
    pub fn new(config: &ContainerConfig) -> Self {
        let groups = config
            .limits
            .iter()
            .map(|limit| Group {
                dir: config.group_dir(&limit.subsystem),
                bind_target: config.bind_target(&limit.subsystem),
                limit: limit.clone(),
            })
            .collect();
        Self { groups }
    }

    /// For each controller in order: creates the group if needed, writes the
    /// limit, enables `notify_on_release`, and moves `pid` into the group.
    ///
    /// Children forked by `pid` afterward inherit the membership.
    ///
    /// # Errors
    ///
    /// Returns [`MiniboxError::CgroupWrite`](minibox_common::error::MiniboxError::CgroupWrite)
    /// for the first file that is missing or rejects its value.
    pub fn apply_limits(&self, pid: Pid) -> Result<()> {
        for group in &self.groups {
            control::ensure_group(&group.dir)?;
            control::write_control(&group.dir.join(&group.limit.control_file), &group.limit.value)?;
            control::write_control(&group.dir.join(NOTIFY_ON_RELEASE_FILE), "1")?;
            control::write_control(&group.dir.join(CGROUP_PROCS_FILE), &pid.to_string())?;
            tracing::info!(limit = %group.limit, %pid, "cgroup limit applied");
        }
        Ok(())
    }

    /// Bind mounts exposing each group under the container root, in
    /// controller order. Mounted after [`apply_limits`](Self::apply_limits).
    #[must_use]
    pub fn bind_records(&self) -> Vec<MountRecord> {
        self.groups
            .iter()
            .map(|g| MountRecord::bind(&g.dir, &g.bind_target))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use minibox_common::error::MiniboxError;

    use super::*;

    /// Lays out a fake cgroup v1 tree with the control files the kernel
    /// would provide for each controller.
    fn fake_hierarchy(root: &Path, config: &ContainerConfig) {
        for limit in &config.limits {
            let dir = root.join(&limit.subsystem).join(&config.cgroup_name);
            std::fs::create_dir_all(&dir).unwrap();
            for file in [limit.control_file.as_str(), NOTIFY_ON_RELEASE_FILE, CGROUP_PROCS_FILE] {
                std::fs::write(dir.join(file), "").unwrap();
            }
        }
    }

    fn config_at(root: &Path) -> ContainerConfig {
        ContainerConfig {
            cgroup_mount: root.to_path_buf(),
            rootfs: root.join("rootfs"),
            ..ContainerConfig::default()
        }
    }

    #[test]
    fn apply_limits_writes_every_control_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_at(dir.path());
        fake_hierarchy(dir.path(), &config);

        CgroupManager::new(&config)
            .apply_limits(Pid::from_raw(4242))
            .unwrap();

        let read = |rel: &str| std::fs::read_to_string(dir.path().join(rel)).unwrap();
        assert_eq!(read("pids/container/pids.max"), "30");
        assert_eq!(read("memory/container/memory.limit_in_bytes"), "31457280");
        assert_eq!(read("cpu/container/cpu.cfs_quota_us"), "50000");
        for subsystem in ["pids", "memory", "cpu"] {
            assert_eq!(read(&format!("{subsystem}/container/notify_on_release")), "1");
            assert_eq!(read(&format!("{subsystem}/container/cgroup.procs")), "4242");
        }
    }

    #[test]
    fn missing_control_file_stops_before_later_controllers() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_at(dir.path());
        fake_hierarchy(dir.path(), &config);
        std::fs::remove_file(dir.path().join("memory/container/memory.limit_in_bytes")).unwrap();

        let err = CgroupManager::new(&config)
            .apply_limits(Pid::from_raw(7))
            .unwrap_err();

        match err {
            MiniboxError::CgroupWrite { path, .. } => {
                assert!(path.ends_with("memory/container/memory.limit_in_bytes"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let cpu_procs = std::fs::read_to_string(dir.path().join("cpu/container/cgroup.procs"));
        assert_eq!(cpu_procs.unwrap(), "");
    }

    #[test]
    fn pid_joins_after_the_limit_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = ContainerConfig {
            limits: vec![CgroupLimit::new("pids", "pids.max", "30")],
            ..config_at(dir.path())
        };
        fake_hierarchy(dir.path(), &config);
        // Without cgroup.procs the limit must already be in place.
        std::fs::remove_file(dir.path().join("pids/container/cgroup.procs")).unwrap();

        let err = CgroupManager::new(&config)
            .apply_limits(Pid::from_raw(7))
            .unwrap_err();

        assert!(matches!(err, MiniboxError::CgroupWrite { .. }));
        let limit = std::fs::read_to_string(dir.path().join("pids/container/pids.max"));
        assert_eq!(limit.unwrap(), "30");
    }

    #[test]
    fn bind_records_follow_controller_order() {
        let config = ContainerConfig::default();
        let targets: Vec<_> = CgroupManager::new(&config)
            .bind_records()
            .into_iter()
            .map(|r| (r.source, r.target))
            .collect();

        assert_eq!(
            targets,
            [
                (
                    PathBuf::from("/sys/fs/cgroup/pids/container"),
                    PathBuf::from("/var/lib/minibox/rootfs/sys/fs/cgroup/pids"),
                ),
                (
                    PathBuf::from("/sys/fs/cgroup/memory/container"),
                    PathBuf::from("/var/lib/minibox/rootfs/sys/fs/cgroup/memory"),
                ),
                (
                    PathBuf::from("/sys/fs/cgroup/cpu/container"),
                    PathBuf::from("/var/lib/minibox/rootfs/sys/fs/cgroup/cpu"),
                ),
            ]
        );
    }
}

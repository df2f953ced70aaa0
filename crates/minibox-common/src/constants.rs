//! System-wide constants and default paths.

/// Default host path of the container root filesystem.
pub const DEFAULT_ROOTFS_DIR: &str = "/var/lib/minibox/rootfs";

/// Mount point of the host's cgroup v1 controller hierarchies.
pub const CGROUP_V1_PATH: &str = "/sys/fs/cgroup";

/// Name of the subgroup created beneath each cgroup controller.
pub const DEFAULT_CGROUP_NAME: &str = "container";

/// Hostname assigned inside the UTS namespace.
pub const DEFAULT_HOSTNAME: &str = "container";

/// Longest hostname accepted by `sethostname(2)` (`HOST_NAME_MAX`).
pub const MAX_HOSTNAME_LEN: usize = 64;

/// Path the running executable is re-invoked through.
pub const SELF_EXE: &str = "/proc/self/exe";

/// Verb selecting the Launcher role.
pub const RUN_VERB: &str = "run";

/// Verb selecting the Bootstrapper role on re-exec.
pub const SUB_VERB: &str = "sub";

/// Mount point of the container's private procfs.
pub const PROC_PATH: &str = "/proc";

/// Directory under the container root where cgroup controllers are bind-mounted.
pub const CONTAINER_CGROUP_DIR: &str = "sys/fs/cgroup";

/// Control file listing the processes of a cgroup.
pub const CGROUP_PROCS_FILE: &str = "cgroup.procs";

/// Control file asking the kernel to run the release agent when the group empties.
pub const NOTIFY_ON_RELEASE_FILE: &str = "notify_on_release";

/// Environment variable naming a JSON configuration file.
pub const CONFIG_ENV: &str = "MINIBOX_CONFIG";

/// Application name used in diagnostics.
pub const APP_NAME: &str = "minibox";

/// Exit code reported for a fatal setup error.
pub const SETUP_FAILURE_EXIT_CODE: u8 = 1;

/// Offset added to a signal number when a process dies from that signal.
pub const SIGNAL_EXIT_OFFSET: i32 = 128;

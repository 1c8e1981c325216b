//! Container specification for one job.

use std::path::PathBuf;

/// The fixed runtime image every job runs in. Ships Node plus a Chromium
/// that Puppeteer can drive.
pub const RUNTIME_IMAGE: &str = "ghcr.io/puppeteer/puppeteer:latest";

/// Where the job directory is bind-mounted inside the container.
pub const JOB_MOUNT: &str = "/job";

/// Writable copy of the job the startup command works in.
const WORK_DIR: &str = "/home/pptruser/job";

/// Immutable configuration for a single container run.
///
/// Built once per job and owned by the runner for the job's lifetime. The
/// startup command is fixed: nothing from the request is ever interpolated
/// into it. The host directory reaches the container through the bind mount
/// only, which keeps shell injection off the table.
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Shell pipeline the container runs: copy the mounted job into a
    /// writable directory, install its dependencies, run its entry point.
    pub startup_command: String,
    /// Canonical host directory holding the job code.
    pub host_dir: PathBuf,
}

impl JobSpec {
    /// Build the spec for a validated job directory. Pure, infallible.
    pub fn new(host_dir: PathBuf) -> Self {
        // `cp -a src/.` picks up dotfiles, which a plain glob would skip.
        let startup_command = format!(
            "mkdir -p {work} && cp -a {mount}/. {work} && cd {work} && npm install && npm start",
            work = WORK_DIR,
            mount = JOB_MOUNT,
        );

        Self {
            startup_command,
            host_dir,
        }
    }

    /// The read-only bind mount entry for Docker's `Binds` list.
    pub fn bind_mount(&self) -> String {
        format!("{}:{}:ro", self.host_dir.display(), JOB_MOUNT)
    }
}

//! Docker container lifecycle for scrapper jobs.
//!
//! One `JobRunner` call walks a job through its whole life:
//!
//! ```text
//! create ──▶ start ──▶ capture ──▶ wait ──▶ exit code
//!    │                                         │
//!    │ image absent                            ├─ 0        ▶ stdout text
//!    ▼                                         └─ non-zero ▶ error
//!  pull ──▶ create (once, then give up)
//! ```
//!
//! The container is created with auto-remove, so the engine reaps it on
//! exit; the runner never deletes a container itself.

use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::sandbox::cancel::CancelToken;
use crate::sandbox::error::{JobError, Result};
use crate::sandbox::spec::{JobSpec, RUNTIME_IMAGE};

/// Executes jobs against a shared Docker connection.
///
/// One instance is constructed at startup and shared by every request. The
/// underlying client is a multiplexed channel, so concurrent jobs need no
/// locking and never observe each other.
pub struct JobRunner {
    docker: Docker,
}

impl JobRunner {
    /// Create a runner on top of an established Docker connection.
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }

    /// Run one job to completion and return its captured stdout.
    pub async fn execute(&self, spec: &JobSpec) -> Result<String> {
        self.execute_with_cancel(spec, CancelToken::disarmed())
            .await
    }

    /// Run one job, racing every stage against the cancel token.
    ///
    /// Stages run strictly in sequence: create, start, capture, wait. A
    /// creation failure classified as "runtime image absent" triggers one
    /// image pull followed by one more creation attempt; a second absence is
    /// reported as a plain creation failure rather than looping.
    pub async fn execute_with_cancel(
        &self,
        spec: &JobSpec,
        mut cancel: CancelToken,
    ) -> Result<String> {
        let container_id = match stage(&mut cancel, self.create_job_container(spec)).await {
            Ok(id) => id,
            Err(JobError::ImageAbsent { image }) => {
                tracing::info!(%image, "runtime image missing, pulling before retry");
                stage(&mut cancel, self.pull_runtime_image()).await?;
                stage(&mut cancel, self.create_job_container(spec))
                    .await
                    .map_err(|e| match e {
                        JobError::ImageAbsent { image } => JobError::CreateFailed {
                            reason: format!("image {image} still absent after a successful pull"),
                        },
                        other => other,
                    })?
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(container_id = %container_id, "container created");

        stage(&mut cancel, self.start(&container_id)).await?;

        // Attach after start; both streams request history, so bytes emitted
        // before the attach completes are still delivered.
        let (stdout_task, stderr_task) = self.attach_log_streams(&container_id);

        let exit_code = stage(&mut cancel, self.wait_for_exit(&container_id)).await?;

        let output = stdout_task.await.map_err(|e| JobError::LogStream {
            reason: e.to_string(),
        })??;
        stderr_task.await.map_err(|e| JobError::LogStream {
            reason: e.to_string(),
        })??;

        interpret_exit(exit_code)?;

        tracing::info!(container_id = %container_id, bytes = output.len(), "job finished cleanly");
        Ok(output)
    }

    /// Create the container for a job.
    async fn create_job_container(&self, spec: &JobSpec) -> Result<String> {
        let host_config = HostConfig {
            binds: Some(vec![spec.bind_mount()]),
            auto_remove: Some(true),
            // An init process reaps the zombie children Chromium leaves behind.
            init: Some(true),
            // Chromium's sandbox needs this to manage its own child processes.
            cap_add: Some(vec!["SYS_ADMIN".to_string()]),
            ..Default::default()
        };

        let config = Config {
            image: Some(RUNTIME_IMAGE.to_string()),
            cmd: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                spec.startup_command.clone(),
            ]),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: format!("scrape-job-{}", Uuid::new_v4()),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| {
                if image_absent(&e) {
                    JobError::ImageAbsent {
                        image: RUNTIME_IMAGE.to_string(),
                    }
                } else {
                    JobError::CreateFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        Ok(created.id)
    }

    async fn start(&self, container_id: &str) -> Result<()> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| JobError::StartFailed {
                reason: e.to_string(),
            })
    }

    /// Attach one stdout stream and one stderr stream to the container.
    ///
    /// Stdout is accumulated in full and becomes the job result. Stderr is
    /// passed through to this process's own stderr as it arrives and is not
    /// retained. Either stream breaking fails the job.
    fn attach_log_streams(
        &self,
        container_id: &str,
    ) -> (JoinHandle<Result<String>>, JoinHandle<Result<()>>) {
        let stdout = {
            let docker = self.docker.clone();
            let id = container_id.to_string();
            tokio::spawn(async move {
                let mut stream = docker.logs(&id, Some(log_options(true)));
                let mut collected = String::new();
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(LogOutput::StdOut { message }) => {
                            collected.push_str(&String::from_utf8_lossy(&message));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            return Err(JobError::LogStream {
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Ok(collected)
            })
        };

        let stderr = {
            let docker = self.docker.clone();
            let id = container_id.to_string();
            tokio::spawn(async move {
                let mut stream = docker.logs(&id, Some(log_options(false)));
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(LogOutput::StdErr { message }) => {
                            eprint!("{}", String::from_utf8_lossy(&message));
                        }
                        Ok(_) => {}
                        Err(e) => {
                            return Err(JobError::LogStream {
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                Ok(())
            })
        };

        (stdout, stderr)
    }

    /// Block until the container reports its terminal exit code.
    async fn wait_for_exit(&self, container_id: &str) -> Result<i64> {
        let mut wait = self.docker.wait_container(
            container_id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );

        match wait.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(JobError::WaitFailed {
                reason: e.to_string(),
            }),
            None => Err(JobError::WaitFailed {
                reason: "wait stream ended before an exit code was reported".to_string(),
            }),
        }
    }

    /// Pull the runtime image, streaming progress into the debug log.
    async fn pull_runtime_image(&self) -> Result<()> {
        tracing::info!(image = RUNTIME_IMAGE, "pulling runtime image");

        let options = CreateImageOptions {
            from_image: RUNTIME_IMAGE.to_string(),
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            match progress {
                Ok(info) => {
                    if let Some(status) = info.status {
                        tracing::debug!(image = RUNTIME_IMAGE, "pull progress: {}", status);
                    }
                }
                Err(e) => {
                    return Err(JobError::PullFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(image = RUNTIME_IMAGE, "runtime image pulled");
        Ok(())
    }
}

/// Race a stage future against cancellation.
async fn stage<T>(
    cancel: &mut CancelToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        res = fut => res,
        _ = cancel.cancelled() => Err(JobError::Cancelled),
    }
}

/// Log options for one side of the container's output.
///
/// `follow` keeps the stream open until the container exits; the full tail
/// makes output from before the attach visible.
fn log_options(stdout: bool) -> LogsOptions<String> {
    LogsOptions {
        follow: true,
        stdout,
        stderr: !stdout,
        tail: "all".to_string(),
        ..Default::default()
    }
}

/// Map a container exit code to the job outcome.
fn interpret_exit(code: i64) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(JobError::NonZeroExit { code })
    }
}

/// True only for the engine's not-found error naming the runtime image.
///
/// Any other failure shape is not recoverable by pulling and must surface
/// as a creation failure.
fn image_absent(err: &bollard::errors::Error) -> bool {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => message.contains(RUNTIME_IMAGE),
        _ => false,
    }
}

/// Connect to the Docker daemon.
///
/// Tries these locations in order:
/// 1. `DOCKER_HOST` env var (bollard default)
/// 2. `/var/run/docker.sock` (Linux default)
/// 3. `~/.docker/run/docker.sock` (Docker Desktop on macOS)
///
/// Each candidate is verified with a ping. An unreachable engine is fatal to
/// the process: callers bail out before serving any requests.
pub async fn connect_docker() -> Result<Docker> {
    if let Ok(docker) = Docker::connect_with_local_defaults()
        && docker.ping().await.is_ok()
    {
        return Ok(docker);
    }

    if let Some(home) = std::env::var_os("HOME") {
        let desktop_sock = std::path::Path::new(&home).join(".docker/run/docker.sock");
        if desktop_sock.exists() {
            let sock_str = desktop_sock.to_string_lossy();
            if let Ok(docker) =
                Docker::connect_with_socket(&sock_str, 120, bollard::API_DEFAULT_VERSION)
                && docker.ping().await.is_ok()
            {
                return Ok(docker);
            }
        }
    }

    Err(JobError::DockerUnavailable {
        reason: "no responsive Docker socket found".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status_code: u16, message: &str) -> bollard::errors::Error {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message: message.to_string(),
        }
    }

    #[test]
    fn zero_exit_succeeds() {
        assert!(interpret_exit(0).is_ok());
    }

    #[test]
    fn nonzero_exit_message_carries_the_code() {
        let err = interpret_exit(1).unwrap_err();
        assert!(err.to_string().contains('1'), "got: {err}");

        let err = interpret_exit(137).unwrap_err();
        assert!(err.to_string().contains("137"), "got: {err}");
    }

    #[test]
    fn missing_runtime_image_is_recoverable() {
        let err = server_error(404, &format!("No such image: {RUNTIME_IMAGE}"));
        assert!(image_absent(&err));
    }

    #[test]
    fn not_found_for_something_else_is_not_recoverable() {
        // A 404 for a container, not the image.
        let err = server_error(404, "No such container: scrape-job-deadbeef");
        assert!(!image_absent(&err));
    }

    #[test]
    fn server_fault_is_not_recoverable() {
        let err = server_error(500, &format!("cannot pull {RUNTIME_IMAGE}"));
        assert!(!image_absent(&err));
    }

    #[test]
    fn stdout_and_stderr_streams_are_disjoint() {
        let out = log_options(true);
        assert!(out.stdout && !out.stderr && out.follow);
        assert_eq!(out.tail, "all");

        let err = log_options(false);
        assert!(!err.stdout && err.stderr && err.follow);
    }

    #[tokio::test]
    async fn docker_connection_smoke() {
        // Requires a running daemon; skip quietly when there is none.
        let Ok(docker) = connect_docker().await else {
            eprintln!("skipping Docker test: daemon not available");
            return;
        };
        assert!(docker.ping().await.is_ok());
    }
}

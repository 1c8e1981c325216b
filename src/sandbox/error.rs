//! Error types for job execution.

/// Errors that can occur while running a scrapper job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The request itself is bad: missing field, or a path that does not
    /// resolve inside the jobs directory. Never retried.
    #[error("invalid job request: {reason}")]
    Validation { reason: String },

    /// Docker daemon is not available or not running.
    #[error("Docker not available: {reason}")]
    DockerUnavailable { reason: String },

    /// The runtime image is missing locally. Recoverable: the runner pulls
    /// the image and retries container creation exactly once.
    #[error("runtime image {image} is not present locally")]
    ImageAbsent { image: String },

    /// Pulling the runtime image failed.
    #[error("image pull failed: {reason}")]
    PullFailed { reason: String },

    /// Failed to create the container.
    #[error("container creation failed: {reason}")]
    CreateFailed { reason: String },

    /// Failed to start the created container.
    #[error("container start failed: {reason}")]
    StartFailed { reason: String },

    /// One of the attached log streams broke before end-of-stream.
    #[error("log stream failed: {reason}")]
    LogStream { reason: String },

    /// Waiting for the container's exit status failed.
    #[error("container wait failed: {reason}")]
    WaitFailed { reason: String },

    /// The job ran to completion but reported a non-zero exit code.
    #[error("job exited with non-zero code {code}")]
    NonZeroExit { code: i64 },

    /// The job was cancelled through the cancellation handle. The gateway
    /// never fires this today; it exists for callers that layer a timeout on
    /// top of the runner.
    #[error("job cancelled")]
    Cancelled,
}

impl JobError {
    /// True for errors caused by the request rather than the runtime.
    pub fn is_validation(&self) -> bool {
        matches!(self, JobError::Validation { .. })
    }
}

/// Result type for job execution.
pub type Result<T> = std::result::Result<T, JobError>;

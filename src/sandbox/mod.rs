//! Docker-backed execution of scrapper jobs.
//!
//! The pieces, leaf to root: [`resolve_job_dir`] keeps caller-supplied paths
//! inside the jobs directory, [`JobSpec`] freezes the container
//! configuration for one job, and [`JobRunner`] drives the container from
//! creation to exit code.

mod cancel;
mod container;
mod error;
mod path;
mod spec;

pub use cancel::{CancelHandle, CancelToken};
pub use container::{JobRunner, connect_docker};
pub use error::{JobError, Result};
pub use path::resolve_job_dir;
pub use spec::{JOB_MOUNT, JobSpec, RUNTIME_IMAGE};

//! scrapperd: an HTTP service that executes scrapper jobs inside disposable
//! Docker containers.
//!
//! A request names a directory of job code under the configured jobs
//! directory. The service validates the path, launches a container from the
//! fixed browser-automation image with the job directory mounted read-only,
//! captures the container's stdout, and answers with that output once the
//! container exits cleanly.

pub mod config;
pub mod gateway;
pub mod sandbox;

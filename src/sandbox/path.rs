//! Path sandbox validation.
//!
//! Every job names a directory relative to the configured jobs directory.
//! The directory is handed to Docker as a bind mount, so an unchecked path
//! would let a request mount arbitrary host directories into a container.

use std::path::{Path, PathBuf};

use crate::sandbox::error::{JobError, Result};

/// Resolve a caller-supplied relative path against the jobs directory.
///
/// Both the base and the joined candidate are canonicalized (symlinks
/// followed) before the prefix check. Checking the unresolved path would let
/// a symlink inside the jobs directory point anywhere on the host and still
/// pass.
///
/// Any filesystem error during resolution (the directory does not exist, a
/// permission problem) rejects the path instead of propagating: a missing
/// job directory is an expected condition, not an internal fault.
pub fn resolve_job_dir(base: &Path, raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        return Err(JobError::Validation {
            reason: "programDirectory must not be empty".to_string(),
        });
    }

    let canonical_base = base.canonicalize().map_err(|_| invalid(raw))?;
    let canonical = canonical_base
        .join(raw)
        .canonicalize()
        .map_err(|_| invalid(raw))?;

    if !canonical.starts_with(&canonical_base) {
        return Err(invalid(raw));
    }

    Ok(canonical)
}

fn invalid(raw: &str) -> JobError {
    JobError::Validation {
        reason: format!("programDirectory {raw:?} does not resolve inside the jobs directory"),
    }
}

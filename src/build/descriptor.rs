//! The generated build descriptor, owned for exactly one invocation.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::error::{Error, Result};

// =============================================================================
// Public Interface
// =============================================================================

/// A build descriptor written in place for the external build step.
///
/// The file is removed when the value is dropped, whether the invocation that
/// used it succeeded, failed or never happened.
#[derive(Debug)]
pub struct BuildDescriptor {
    path: PathBuf,
}

impl BuildDescriptor {
    /// Copy `template` to `destination`, replacing any stale descriptor left
    /// there.
    pub fn write(template: &Path, destination: PathBuf) -> Result<Self> {
        fs::copy(template, &destination).map_err(|e| {
            Error::io(
                format!(
                    "could not write build descriptor `{}` from `{}`",
                    destination.display(),
                    template.display()
                ),
                e,
            )
        })?;
        debug!("descriptor written to {}", destination.display());
        Ok(BuildDescriptor { path: destination })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildDescriptor {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("descriptor {} removed", self.path.display()),
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(ref e) => warn!(
                "could not remove descriptor {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

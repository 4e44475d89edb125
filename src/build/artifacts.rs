//! Output layout and generated artifacts.
//!
//! Everything here is idempotent: creating a layout that exists or removing
//! files that are already gone succeeds without doing anything.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::{
    config::Project,
    error::{Error, Result},
};

use super::discover::{files_with_extension, HEADER_EXTENSION};

/// Sub-directories of the output root: headers, static libraries and firmware
/// images.
pub const LAYOUT: [&str; 3] = ["include", "lib", "codes"];

// =============================================================================
// Public Interface
// =============================================================================

/// Create the output layout under the project's output root.
pub fn prepare_layout(project: &Project) -> Result<()> {
    let outputs = project.outputs_dir();
    for sub in LAYOUT.iter() {
        let dir = outputs.join(sub);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::io(format!("could not create `{}`", dir.display()), e))?;
    }
    debug!("output layout ready in {}", outputs.display());
    Ok(())
}

/// Copy the board variant headers into `<outputs>/include`, overwriting older
/// copies. A missing variant directory is reported and skipped.
///
/// Returns the number of headers copied.
pub fn copy_variant_headers(project: &Project) -> Result<usize> {
    let variant = project.variant_dir();
    if !variant.is_dir() {
        warn!("variant directory {} not found", variant.display());
        return Ok(0);
    }

    let include = project.outputs_dir().join(LAYOUT[0]);
    let headers = files_with_extension(&variant, HEADER_EXTENSION)?;
    for header in headers.iter() {
        let destination = include.join(header);
        fs::copy(variant.join(header), &destination).map_err(|e| {
            Error::io(format!("could not copy `{}`", destination.display()), e)
        })?;
    }
    debug!("{} variant headers copied", headers.len());
    Ok(headers.len())
}

/// The final image followed by the intermediate images of the firmware.
pub fn firmware_images(project: &Project) -> Vec<PathBuf> {
    let codes = project.outputs_dir().join(LAYOUT[2]);
    let codename = &project.config().codename;
    ["hex", "elf", "o"]
        .iter()
        .map(|ext| codes.join(format!("{}.{}", codename, ext)))
        .collect()
}

/// Remove the firmware images. Returns the files that actually existed.
pub fn remove_images(project: &Project) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for image in firmware_images(project) {
        if remove_if_exists(&image)? {
            removed.push(image);
        }
    }
    Ok(removed)
}

// =============================================================================
// Private stuff
// =============================================================================

fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed {}", path.display());
            Ok(true)
        }
        Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(
            format!("could not remove `{}`", path.display()),
            e,
        )),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Source discovery inside a library directory.

use std::{fs, path::Path};

use log::{trace, warn};

use crate::error::{Error, Result};

/// Extension of C sources.
pub const C_EXTENSION: &str = "c";
/// Extension of C++ sources.
pub const CPP_EXTENSION: &str = "cpp";
/// Extension of public headers.
pub const HEADER_EXTENSION: &str = "h";
/// Extension the external step gives to compiled objects.
pub const OBJECT_EXTENSION: &str = "o";

// =============================================================================
// Public Interface
// =============================================================================

/// The file names found directly inside a library directory, partitioned by
/// kind. Each list is sorted and free of duplicates.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Sources {
    pub c: Vec<String>,
    pub cpp: Vec<String>,
    pub headers: Vec<String>,
}

impl Sources {
    /// Object names for all sources, C sources first.
    pub fn objects(&self) -> Vec<String> {
        object_names(&self.c, &self.cpp)
    }
}

/// List the base names of the regular files directly inside `dir` whose
/// extension is exactly `extension`. No match is an empty list, not an error.
pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| Error::io(format!("could not list `{}`", dir.display()), e))?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            Path::new(&entry.file_name())
                .extension()
                .map_or(false, |e| e == extension)
        })
        .filter_map(|entry| match entry.file_name().into_string() {
            Ok(name) => Some(name),
            Err(name) => {
                warn!("skipping source with a non UTF-8 name: {:?}", name);
                None
            }
        })
        .collect();
    names.sort();
    names.dedup();

    trace!("{} `.{}` files in {}", names.len(), extension, dir.display());
    Ok(names)
}

/// Gather the C sources, C++ sources and headers of a library directory.
pub fn discover(dir: &Path) -> Result<Sources> {
    Ok(Sources {
        c: files_with_extension(dir, C_EXTENSION)?,
        cpp: files_with_extension(dir, CPP_EXTENSION)?,
        headers: files_with_extension(dir, HEADER_EXTENSION)?,
    })
}

/// Replace the source extension of every name with the object extension,
/// keeping the order of each list and putting C objects before C++ ones.
pub fn object_names(c_sources: &[String], cpp_sources: &[String]) -> Vec<String> {
    c_sources
        .iter()
        .chain(cpp_sources.iter())
        .map(|name| {
            Path::new(name)
                .with_extension(OBJECT_EXTENSION)
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

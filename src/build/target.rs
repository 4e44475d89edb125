//! A library target, resolved fresh from its directory for every invocation.

use std::path::PathBuf;

use crate::{
    config::Project,
    error::{Error, Result},
};

use super::{
    discover::{discover, Sources},
    flags::{compose, FlagSet},
};

// =============================================================================
// Public Interface
// =============================================================================

/// One library under the source root, built into `lib<name>.a`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LibraryTarget {
    pub name: String,
    /// Directory of the library, relative to the project root.
    pub dir: PathBuf,
    pub sources: Sources,
    pub flags: FlagSet,
}

impl LibraryTarget {
    /// Inspect the library directory and compose its flags.
    pub fn resolve(project: &Project, name: &str) -> Result<Self> {
        let absolute = project.library_dir(name);
        if !absolute.is_dir() {
            return Err(Error::LibraryNotFound {
                name: name.to_string(),
                sources: project.sources_dir(),
            });
        }

        Ok(LibraryTarget {
            name: name.to_string(),
            dir: PathBuf::from(&project.config().sources).join(name),
            sources: discover(&absolute)?,
            flags: compose(project.config(), &project.outputs_from_library()),
        })
    }

    /// File name of the static archive produced for this library.
    pub fn archive_name(&self) -> String {
        format!("lib{}.a", self.name)
    }

    /// Space separated object list for the external step.
    pub fn object_list(&self) -> String {
        self.sources.objects().join(" ")
    }

    /// Space separated header list for the external step.
    pub fn header_list(&self) -> String {
        self.sources.headers.join(" ")
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use super::*;
    use crate::config::tests::sample_config;

    #[test]
    fn resolves_lists_and_flags() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("src").join("Wire");
        fs::create_dir_all(&lib).unwrap();
        for name in ["Wire.cpp", "Wire.h", "twi.c"] {
            fs::write(lib.join(name), "").unwrap();
        }
        let project = Project::new(dir.path(), sample_config());

        let target = LibraryTarget::resolve(&project, "Wire").unwrap();
        assert_eq!(target.dir, Path::new("src/Wire"));
        assert_eq!(target.archive_name(), "libWire.a");
        assert_eq!(target.object_list(), "twi.o Wire.o");
        assert_eq!(target.header_list(), "Wire.h");
        assert!(target.flags.c.starts_with("-I../../out/include "));
    }

    #[test]
    fn unknown_library_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let project = Project::new(dir.path(), sample_config());
        match LibraryTarget::resolve(&project, "SPI") {
            Err(Error::LibraryNotFound { name, .. }) => assert_eq!(name, "SPI"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}

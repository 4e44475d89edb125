//! Error type of the build orchestrator.

use std::{io, path::PathBuf};

use thiserror::Error;

// =============================================================================
// Public Interface
// =============================================================================

/// Result alias used throughout `avrkit`.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong before or around an external toolchain
/// invocation. Failures of the toolchain itself are not errors; they are
/// reported through [`BuildReport`](crate::BuildReport).
#[derive(Debug, Error)]
pub enum Error {
    /// The settings file could not be read.
    #[error("could not read settings file `{path}`")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The settings file is not valid or lacks a required key.
    #[error("invalid settings file `{path}`: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A required setting is present but empty.
    #[error("setting `{0}` must not be empty")]
    EmptySetting(&'static str),

    /// The requested library has no directory under the source root.
    #[error("library `{name}` not found in `{}`", .sources.display())]
    LibraryNotFound { name: String, sources: PathBuf },

    /// `build` and `rebuild` need to know which library to work on.
    #[error("action `{0}` requires a library name or `all`")]
    MissingLibrary(String),

    /// A filesystem operation failed.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap an [`io::Error`] with a message describing what was attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn io_error_keeps_context_and_source() {
    use std::error::Error as _;

    let err = Error::io(
        "could not create `out/lib`",
        io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    );
    assert_eq!(err.to_string(), "could not create `out/lib`");
    assert_eq!(err.source().unwrap().to_string(), "denied");
}

#[test]
fn missing_library_message_names_the_action() {
    let err = Error::MissingLibrary("rebuild".into());
    assert_eq!(
        err.to_string(),
        "action `rebuild` requires a library name or `all`"
    );
}

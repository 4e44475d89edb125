//! `avrkit` library build pipeline.
//!
//! Each library lives in its own directory under the configured source root
//! and is turned into one static archive (`lib<name>.a`) by an external,
//! make-based build step. The pipeline decides *what* to run and in *which*
//! order, the external step does the actual compiling and archiving.
//!
//! For one library and one action, a run goes through:
//!
//! ```text
//!   Idle --> Prepared --> Invoking --> Done
//!              |             |          ^
//!              |             '----------'  descriptor removed
//!              '--> Failed                 whatever the outcome
//! ```
//!
//! * **Prepared**: the build descriptor is written next to the sources, the
//!   object and header lists are gathered and the flags composed.
//! * **Invoking**: the external step runs with the action, lists, flags and
//!   output archive name. Its standard output is merged into standard error.
//! * **Done**: the descriptor is removed, even when the step failed.
//!
//! **Example** - Building every library of a project:
//! ```no_run
//! use std::path::Path;
//! use avrkit::{Pipeline, ProcessRunner, Project, Request};
//!
//! let project = Project::load(".", Path::new("bin/settings.toml")).unwrap();
//! let request = Request::parse("build", Some("all")).unwrap();
//! let mut pipeline = Pipeline::new(&project, ProcessRunner);
//! let report = pipeline.execute(&request).unwrap();
//! std::process::exit(if report.is_success() { 0 } else { 1 });
//! ```

mod artifacts;
mod descriptor;
mod discover;
mod flags;
mod invoke;
mod pipeline;
mod target;

pub use artifacts::{
    copy_variant_headers, firmware_images, prepare_layout, remove_images, LAYOUT,
};
pub use descriptor::BuildDescriptor;
pub use discover::{discover, files_with_extension, object_names, Sources};
pub use flags::{compose, compose_base, link_flags, FlagSet};
pub use invoke::{Invocation, InvocationOutcome, ProcessRunner, Runner};
pub use pipeline::{
    Action, BuildReport, Pipeline, ReportEntry, Request, Selector, ALL_LIBRARIES,
};
pub use target::LibraryTarget;

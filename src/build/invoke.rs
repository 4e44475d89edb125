//! Invocations of the external build step.
//!
//! Parameters are passed as separate arguments (`NAME=value`), never through a
//! shell, so flags with spaces or quotes reach the build tool untouched.

use std::{
    ffi::OsString,
    fmt, io,
    path::PathBuf,
    process::{Command, Stdio},
};

use log::debug;

use crate::config::Project;

use super::{flags::compose, target::LibraryTarget};

// =============================================================================
// Public Interface
// =============================================================================

/// A fully described run of the external build tool.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Invocation {
    pub program: String,
    /// Working directory of the child process.
    pub current_dir: PathBuf,
    pub args: Vec<OsString>,
}

impl Invocation {
    /// Build one library target with `action` (`init`, `build`, ...).
    pub fn library(project: &Project, target: &LibraryTarget, action: &str) -> Self {
        let config = project.config();
        let mut args: Vec<OsString> = vec!["-C".into(), target.dir.clone().into(), action.into()];
        args.extend(
            [
                ("OBJS", target.object_list()),
                ("CPPFLAGS", target.flags.cpp.clone()),
                ("CFLAGS", target.flags.c.clone()),
                ("ARFLAGS", target.flags.ar.clone()),
                ("OUTPUTS", project.outputs_from_library()),
                ("HDRS", target.header_list()),
                ("LIBOUT", target.archive_name()),
                ("AR", config.ar.clone()),
                ("CC", config.cc.clone()),
                ("CPP", config.cpp.clone()),
            ]
            .iter()
            .map(|(name, value)| parameter(name, value)),
        );
        Invocation {
            program: config.make.clone(),
            current_dir: project.root().to_path_buf(),
            args,
        }
    }

    /// Run a project level action (compile the firmware entry file, flash the
    /// device, ...) with the root build descriptor.
    pub fn project(project: &Project, action: &str) -> Self {
        let config = project.config();
        let flags = compose(config, &config.outputs);
        let mut args: Vec<OsString> = vec![action.into()];
        args.extend(
            [
                ("CPP", config.cpp.clone()),
                ("OBJC", config.objcopy.clone()),
                ("CFLAGS", flags.c),
                ("OUTPUTS", config.outputs.clone()),
                ("CODENAME", config.codename.clone()),
                ("COMPORT", config.comport.clone()),
                ("PROGRAMMER", config.programmer.clone()),
                ("PARTNO", config.partno.clone()),
                ("LIBSTRING", config.library_link_flags()),
            ]
            .iter()
            .map(|(name, value)| parameter(name, value)),
        );
        Invocation {
            program: config.make.clone(),
            current_dir: project.root().to_path_buf(),
            args,
        }
    }

    /// Remove the firmware images through the root build descriptor.
    pub fn project_clean(project: &Project) -> Self {
        let config = project.config();
        Invocation {
            program: config.make.clone(),
            current_dir: project.root().to_path_buf(),
            args: vec![
                "clean2".into(),
                parameter("OUTPUTS", &config.outputs),
                parameter("CODENAME", &config.codename),
            ],
        }
    }

    /// The action argument: first argument after the optional `-C <dir>`.
    pub fn action(&self) -> Option<&OsString> {
        match self.args.first() {
            Some(first) if first == "-C" => self.args.get(2),
            other => other,
        }
    }

    /// Value of a `NAME=value` parameter, if present.
    pub fn parameter(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.args.iter().find_map(|arg| {
            arg.to_str()
                .and_then(|a| a.strip_prefix(prefix.as_str()))
                .map(String::from)
        })
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.args.iter() {
            write!(f, " {:?}", arg)?;
        }
        Ok(())
    }
}

/// How an invocation ended. The pipeline records it and moves on.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InvocationOutcome {
    Succeeded,
    /// The tool ran and reported failure; `None` when killed by a signal.
    Failed(Option<i32>),
    /// The tool could not be started at all.
    NotStarted(String),
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Succeeded)
    }
}

impl fmt::Display for InvocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationOutcome::Succeeded => write!(f, "succeeded"),
            InvocationOutcome::Failed(Some(code)) => write!(f, "failed with exit status {}", code),
            InvocationOutcome::Failed(None) => write!(f, "terminated by a signal"),
            InvocationOutcome::NotStarted(reason) => write!(f, "could not be started: {}", reason),
        }
    }
}

/// Something able to carry out an [`Invocation`]. Blocks until it completes.
pub trait Runner {
    fn run(&mut self, invocation: &Invocation) -> InvocationOutcome;
}

/// Runs invocations as child processes, with the child's standard output
/// merged into our standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation) -> InvocationOutcome {
        debug!("running {}", invocation);
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.current_dir)
            .stdout(Stdio::from(io::stderr()))
            .status();
        match status {
            Ok(status) if status.success() => InvocationOutcome::Succeeded,
            Ok(status) => InvocationOutcome::Failed(status.code()),
            Err(e) => InvocationOutcome::NotStarted(e.to_string()),
        }
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn parameter(name: &str, value: &str) -> OsString {
    format!("{}={}", name, value).into()
}

// =============================================================================
// Unit Tests
// =============================================================================

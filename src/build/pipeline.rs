//! Orchestration of library and project level actions.

use std::{fmt, fs};

use console::style;
use log::{debug, info, warn};

use crate::{
    config::Project,
    error::{Error, Result},
};

use super::{
    artifacts,
    descriptor::BuildDescriptor,
    invoke::{Invocation, InvocationOutcome, Runner},
    target::LibraryTarget,
};

/// Selector value meaning every library under the source root.
pub const ALL_LIBRARIES: &str = "all";

/// Label used in reports for project level invocations.
const PROJECT_LABEL: &str = "<project>";

// =============================================================================
// Public Interface
// =============================================================================

/// What the orchestrator has been asked to do.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Action {
    /// Prepare a library's build state. Always run before `Build`/`Rebuild`.
    Init,
    Build,
    Rebuild,
    Clean,
    /// Any other action, carried out once on the whole firmware (compile the
    /// entry file, flash the device, ...).
    Project(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::Init => "init",
            Action::Build => "build",
            Action::Rebuild => "rebuild",
            Action::Clean => "clean",
            Action::Project(name) => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which libraries an action applies to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Selector {
    All,
    Library(String),
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        if name == ALL_LIBRARIES {
            Selector::All
        } else {
            Selector::Library(name.to_string())
        }
    }
}

/// An action together with its library selector.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Request {
    pub action: Action,
    pub selector: Option<Selector>,
}

impl Request {
    /// Interpret the command line words `<action> [<library>]`.
    ///
    /// `build` and `rebuild` require a library (or `all`), `clean` takes an
    /// optional one and every other word is a project level action for which
    /// the library argument is ignored.
    pub fn parse(action: &str, library: Option<&str>) -> Result<Self> {
        let selector = library.map(Selector::from);
        let action = match action {
            "build" => Action::Build,
            "rebuild" => Action::Rebuild,
            "clean" => Action::Clean,
            other => {
                return Ok(Request {
                    action: Action::Project(other.to_string()),
                    selector: None,
                })
            }
        };
        if selector.is_none() && action != Action::Clean {
            return Err(Error::MissingLibrary(action.to_string()));
        }
        Ok(Request { action, selector })
    }
}

/// One recorded invocation of the external build step.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ReportEntry {
    /// The library name, or `<project>` for project level invocations.
    pub target: String,
    pub action: String,
    pub outcome: InvocationOutcome,
}

/// Outcomes of every invocation made while executing a request, in order.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BuildReport {
    pub entries: Vec<ReportEntry>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.entries.iter().all(|e| e.outcome.is_success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.outcome.is_success())
    }

    fn record(&mut self, target: &str, action: &str, outcome: InvocationOutcome) {
        self.entries.push(ReportEntry {
            target: target.to_string(),
            action: action.to_string(),
            outcome,
        });
    }
}

/// Drives the external build step for library and project level actions.
///
/// Invocations run strictly one after another. A failing invocation is
/// recorded in the [`BuildReport`] and the pipeline carries on with the next
/// one; only problems preparing an invocation (missing library, unreadable
/// template, ...) abort the run with an [`Error`].
pub struct Pipeline<'p, R: Runner> {
    project: &'p Project,
    runner: R,
}

impl<'p, R: Runner> Pipeline<'p, R> {
    pub fn new(project: &'p Project, runner: R) -> Self {
        Pipeline { project, runner }
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Carry out `request`. The output layout is prepared first, whatever the
    /// action.
    pub fn execute(&mut self, request: &Request) -> Result<BuildReport> {
        artifacts::prepare_layout(self.project)?;
        artifacts::copy_variant_headers(self.project)?;

        let mut report = BuildReport::default();
        match (&request.action, &request.selector) {
            (Action::Build, Some(selector)) | (Action::Rebuild, Some(selector)) => {
                let libraries = self.libraries(selector)?;
                for name in libraries.iter() {
                    self.run_library(name, &Action::Init, &mut report)?;
                }
                for name in libraries.iter() {
                    self.run_library(name, &request.action, &mut report)?;
                }
                eprintln!("\n{}", style("Library Compilation Done").green());
            }
            (Action::Init, Some(selector)) | (Action::Clean, Some(selector)) => {
                for name in self.libraries(selector)?.iter() {
                    self.run_library(name, &request.action, &mut report)?;
                }
                if request.action == Action::Clean {
                    eprintln!("\n{}", style("Clean Done").green());
                }
            }
            // Without a library, only the firmware images are cleaned; the
            // libraries keep their objects.
            (Action::Clean, None) => {
                self.clean_project(&mut report)?;
                eprintln!("\n{}", style(".hex & .elf Files Cleaned").green());
                eprintln!("{}", style("Clean Done").green());
            }
            (Action::Project(name), _) => {
                self.run_project(Invocation::project(self.project, name), &mut report)?;
                eprintln!("\n{}", style("Compilation Done").green());
            }
            (action, None) => return Err(Error::MissingLibrary(action.to_string())),
        }
        Ok(report)
    }

    /// Library names the selector stands for. `all` is every non hidden
    /// directory under the source root, in lexicographic order.
    pub fn libraries(&self, selector: &Selector) -> Result<Vec<String>> {
        match selector {
            Selector::Library(name) => {
                if self.project.library_dir(name).is_dir() {
                    Ok(vec![name.clone()])
                } else {
                    Err(Error::LibraryNotFound {
                        name: name.clone(),
                        sources: self.project.sources_dir(),
                    })
                }
            }
            Selector::All => {
                let sources = self.project.sources_dir();
                let entries = fs::read_dir(&sources).map_err(|e| {
                    Error::io(format!("could not list `{}`", sources.display()), e)
                })?;
                // `Path::is_dir` follows symlinks, as naming the library does.
                let mut names: Vec<String> = entries
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.path().is_dir())
                    .filter_map(|entry| match entry.file_name().into_string() {
                        Ok(name) => Some(name),
                        Err(name) => {
                            warn!("skipping library with a non UTF-8 name: {:?}", name);
                            None
                        }
                    })
                    .filter(|name| !name.starts_with('.'))
                    .collect();
                names.sort();
                debug!("libraries: {:?}", names);
                Ok(names)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Private stuff
    // -------------------------------------------------------------------------

    fn run_library(&mut self, name: &str, action: &Action, report: &mut BuildReport) -> Result<()> {
        info!("=> Prepared {} ({})", name, action);
        eprintln!("\n{} {}", style(action.as_str()).cyan(), style(name).bold());

        let descriptor = BuildDescriptor::write(
            &self.project.template_path(),
            self.project.library_descriptor(name),
        )?;
        let target = LibraryTarget::resolve(self.project, name)?;
        let invocation = Invocation::library(self.project, &target, action.as_str());

        info!("=> Invoking {}", invocation);
        let outcome = self.runner.run(&invocation);
        drop(descriptor);

        info!("=> Done {} ({}): {}", name, action, outcome);
        report_outcome(name, &outcome);
        report.record(name, action.as_str(), outcome);
        Ok(())
    }

    fn run_project(&mut self, invocation: Invocation, report: &mut BuildReport) -> Result<()> {
        let action = invocation
            .action()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("=> Prepared {} ({})", PROJECT_LABEL, action);

        let descriptor =
            BuildDescriptor::write(&self.project.template_path(), self.project.root_descriptor())?;

        info!("=> Invoking {}", invocation);
        let outcome = self.runner.run(&invocation);
        drop(descriptor);

        info!("=> Done {} ({}): {}", PROJECT_LABEL, action, outcome);
        report_outcome(PROJECT_LABEL, &outcome);
        report.record(PROJECT_LABEL, &action, outcome);
        Ok(())
    }

    fn clean_project(&mut self, report: &mut BuildReport) -> Result<()> {
        self.run_project(Invocation::project_clean(self.project), report)?;
        for image in artifacts::remove_images(self.project)? {
            debug!("removed leftover {}", image.display());
        }
        Ok(())
    }
}

fn report_outcome(target: &str, outcome: &InvocationOutcome) {
    if !outcome.is_success() {
        eprintln!(
            "{} {} {}",
            style("error:").red().bold(),
            style(target).bold(),
            outcome
        );
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

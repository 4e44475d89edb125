//! `avrkit` drives the build of AVR firmware projects and watches what the
//! boards print on their serial line.
//!
//! A project is described by a `settings.toml` file: the code name of the
//! firmware, the target MCU and its clock, the programmer, the libraries to
//! link and the compiler flags. From there, two tools are provided:
//!
//! * `avrbuild` turns every library directory of the project into a static
//!   archive, then builds, uploads or cleans the firmware itself. The heavy
//!   lifting is delegated to `make`, which is given a build descriptor and
//!   all the lists, flags and paths it needs on its command line. See
//!   [`Pipeline`].
//! * `avrmon` is a serial monitor. It scans the ports, lets the user pick one
//!   and a baud rate, and prints the device output line by line. It survives
//!   unplugging and re-plugging the board, and only stops when interrupted.
//!   See [`factory`] and [`Monitor`].
//!
//! The monitor is implemented as a state machine, with the following
//! characteristics:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * Some data is shared by **all** states.
//! * Transitions between states are triggered via typed **events** and follow
//!   defined semantics.
//! * Only explicitly defined transitions are permitted, and as many errors as
//!   possible are detected at **compile-time**.
//! * Transitioning from one state to another consumes the previous state.
//!
//! Transitions leverage `rust`'s `From` and `Into` pattern: each `event` type
//! is converted into the `state` it leads to, and only the transitions for
//! which a `From` implementation exists compile.

mod build;
mod config;
mod error;
pub mod monitor;
mod settings;
mod utils;

pub use build::{
    compose, compose_base, copy_variant_headers, discover, files_with_extension,
    firmware_images, link_flags, object_names, prepare_layout, remove_images, Action,
    BuildDescriptor, BuildReport, FlagSet, Invocation, InvocationOutcome, LibraryTarget,
    Pipeline, ProcessRunner, ReportEntry, Request, Runner, Selector, Sources, ALL_LIBRARIES,
    LAYOUT,
};
pub use config::{BuildConfig, Project, DESCRIPTOR_NAME};
pub use error::{Error, Result};
pub use monitor::{factory, Monitor, INTERRUPT_EXIT_CODE};
pub use settings::{parse_baud_rate, MonitorSettings, MonitorSettingsBuilder};
pub use utils::{
    candidate_names, classify_open_error, scan, Console, PortBackend, PortCandidate, PortStatus,
    SystemPorts, Terminal,
};

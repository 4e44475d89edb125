//! `avrkit` serial monitor.
//!
//! The monitor finds the serial ports of the host, asks the user which one to
//! open and at which baud rate, then prints every line the device sends. When
//! the connection is lost it starts over; only an interrupt ends it.
//!
//! **Example** - Running the monitor against the host's serial ports:
//! ```no_run
//! use std::sync::{atomic::AtomicBool, Arc};
//! use avrkit::{self as ak, SystemPorts, Terminal};
//!
//! let interrupt = Arc::new(AtomicBool::new(false));
//! let mut monitor = ak::factory(
//!     ak::MonitorSettingsBuilder::default().finalize(),
//!     Box::new(SystemPorts),
//!     Box::new(Terminal::new(interrupt.clone())),
//!     interrupt,
//! );
//! let status = monitor.run(); // status code returned after the interrupt
//! std::process::exit(status);
//! ```

mod events;
mod state_machine;
mod states;

pub use state_machine::{factory, Monitor, INTERRUPT_EXIT_CODE};

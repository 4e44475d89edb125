//! States for the serial monitor state machine.
//!
//! This modules is private and restricted to the [`monitor`](crate::monitor)
//! scope. The public interface of the state machine is provided by
//! [`monitor`](crate::monitor).
//!
//! ```ignore
//! use super::states::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::{
    fmt,
    io::{self, BufRead, BufReader, Read},
};

use console::style;
use hexplay::HexViewBuilder;
use log::{debug, info, log_enabled, trace, Level::Trace};

use super::{events::*, state_machine::Session};
use crate::{
    settings::{parse_baud_rate, MonitorSettings, MonitorSettingsBuilder},
    utils::{scan, PortCandidate},
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state can do any work that needs to be done and
    /// when finished, requests a transition to a `new state` by returning the
    /// appropriate `event`. The `state` and the `event` are consumed to create
    /// the `new state` using the corresponding [`From`] trait implementation
    /// (provided such implementation exists).
    fn run(&mut self, settings: &MonitorSettings, session: &mut Session) -> Event;
}

// Scanning State ==============================================================

/// The initial state of the monitor, and the state it comes back to after
/// every closed or failed connection.
///
/// From the `ScanningState`, the state machine can evolve via the following
/// transitions:
///
///  * **[`PortsFoundEvent`] => [`AwaitingSelectionState`]** when at least one
///    port was found, available or busy,
///  * **[`ScanEvent`] => [`ScanningState`]** when no port was found, after a
///    pause.
#[derive(Debug)]
pub(crate) struct ScanningState {}
impl Runnable for ScanningState {
    fn run(&mut self, settings: &MonitorSettings, session: &mut Session) -> Event {
        info!("=> Scanning");
        let ports = scan(session.backend.as_mut());
        if ports.is_empty() {
            session.console.wait(
                "Error or No Available Serial Ports",
                settings.retry_delay,
                &session.interrupt,
            );
            return Event::Scan(ScanEvent {
                settings: settings.clone(),
            });
        }

        session.console.show_ports(&ports);
        Event::PortsFound(PortsFoundEvent {
            settings: settings.clone(),
            ports,
        })
    }
}

// AwaitingSelection State =====================================================

/// The user is asked for a port name and a baud rate.
///
/// Any port name is accepted, including one that was not in the scan
/// results; the next state finds out whether it can be opened. A baud rate
/// that is not a number becomes `0`.
#[derive(Debug)]
pub(crate) struct AwaitingSelectionState {
    pub ports: Vec<PortCandidate>,
}
impl Runnable for AwaitingSelectionState {
    fn run(&mut self, settings: &MonitorSettings, session: &mut Session) -> Event {
        info!("=> AwaitingSelection");

        let port = session.console.prompt("Enter Port").unwrap_or_default();
        if session.interrupted() {
            return interrupt(settings);
        }
        let baud_rate = session.console.prompt("Enter Baud Rate").unwrap_or_default();
        if session.interrupted() {
            return interrupt(settings);
        }

        let port = port.trim();
        if !self.ports.iter().any(|p| p.name == port) {
            debug!("`{}` was not found by the last scan", port);
        }

        Event::PortSelected(PortSelectedEvent {
            settings: MonitorSettingsBuilder::from_settings(settings.clone())
                .path(port)
                .baud_rate(parse_baud_rate(&baud_rate))
                .finalize(),
        })
    }
}

// Connecting State ============================================================

/// Open the selected port with the fixed framing.
///
///  * **[`ConnectedEvent`] => [`StreamingState`]** when the port is open,
///  * **[`ScanEvent`] => [`ScanningState`]** when it could not be opened.
#[derive(Debug)]
pub(crate) struct ConnectingState {}
impl Runnable for ConnectingState {
    fn run(&mut self, settings: &MonitorSettings, session: &mut Session) -> Event {
        info!("=> Connecting");
        let path = settings.path.clone().unwrap_or_default();

        match session.backend.open(settings) {
            Ok(port) => {
                session
                    .console
                    .notice(&format!("\n>>>>>>>>>>{}<<<<<<<<<<", path.to_uppercase()));
                Event::Connected(ConnectedEvent {
                    settings: settings.clone(),
                    port,
                })
            }
            Err(ref e) => {
                info!("error: {}", e);
                session.console.notice(&format!(
                    "{} could not open `{}`: {}",
                    style("error:").red(),
                    path,
                    e
                ));
                session
                    .console
                    .wait("Scanning again...", settings.retry_delay, &session.interrupt);
                Event::Scan(ScanEvent {
                    settings: settings.clone(),
                })
            }
        }
    }
}

// Streaming State =============================================================

/// Read lines from the port and emit them, for as long as reads succeed.
///
/// Read timeouts are not failures: they only give the state a chance to notice
/// an interrupt. Any other read error, or the end of the stream, closes the
/// connection.
///
///  * **[`ConnectionLostEvent`] => [`ClosedState`]** on read error or end of
///    stream,
///  * **[`InterruptEvent`] => [`DoneState`]** when the user asked to terminate.
pub(crate) struct StreamingState {
    /// The open port.
    ///
    /// Consumed by `run`, and dropped (closed) when the state ends.
    pub port: Option<Box<dyn Read + Send>>,
}
impl Runnable for StreamingState {
    fn run(&mut self, settings: &MonitorSettings, session: &mut Session) -> Event {
        info!("=> Streaming");

        let port = match self.port.take() {
            Some(port) => port,
            None => {
                return Event::ConnectionLost(ConnectionLostEvent {
                    settings: settings.clone(),
                    reason: "port already consumed".into(),
                })
            }
        };

        let mut reader = BufReader::new(port);
        let mut pending: Vec<u8> = Vec::new();
        loop {
            if session.interrupted() {
                return interrupt(settings);
            }

            match reader.read_until(b'\n', &mut pending) {
                Ok(0) => {
                    flush(&mut pending, session);
                    return connection_lost(settings, "end of stream".into());
                }
                Ok(_) => {
                    if pending.ends_with(b"\n") {
                        flush(&mut pending, session);
                    }
                }
                Err(ref e) if is_transient(e) => {
                    trace!("read: {}", e);
                }
                Err(e) => {
                    flush(&mut pending, session);
                    return connection_lost(settings, e.to_string());
                }
            }
        }
    }
}
impl fmt::Debug for StreamingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingState")
            .field("open", &self.port.is_some())
            .finish()
    }
}

// Closed State ================================================================

/// The connection is gone; report why and go back to scanning.
#[derive(Debug)]
pub(crate) struct ClosedState {
    pub reason: String,
}
impl Runnable for ClosedState {
    fn run(&mut self, settings: &MonitorSettings, session: &mut Session) -> Event {
        info!("=> Closed ({})", self.reason);
        session.console.notice(&format!(
            "\n{} {}",
            style("Connection closed:").yellow(),
            self.reason
        ));
        Event::Scan(ScanEvent {
            settings: settings.clone(),
        })
    }
}

// Done State ==================================================================

/// Reached when the user interrupts the monitor.
///
/// This state goes into a 2-phase execution. During the initial phase, it runs
/// like any other state and reports the exit. It then triggers the
/// [`ExitEvent`] to cause the monitor to leave its event loop.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {
    /// When `true` instructs the monitor to exit its event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, settings: &MonitorSettings, session: &mut Session) -> Event {
        info!("=> Done");
        session.console.notice("Exiting");
        Event::Exit(ExitEvent {
            settings: settings.clone(),
        })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn interrupt(settings: &MonitorSettings) -> Event {
    Event::Interrupt(InterruptEvent {
        settings: settings.clone(),
    })
}

fn connection_lost(settings: &MonitorSettings, reason: String) -> Event {
    Event::ConnectionLost(ConnectionLostEvent {
        settings: settings.clone(),
        reason,
    })
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Emit the buffered bytes as one line, without its line terminator.
fn flush(pending: &mut Vec<u8>, session: &mut Session) {
    if pending.is_empty() {
        return;
    }

    // Dump the received data in a hex table for debugging
    if log_enabled!(Trace) {
        let view = HexViewBuilder::new(&pending[..])
            .address_offset(0)
            .row_width(16)
            .finish();
        trace!("\n{}", view);
    }

    let mut end = pending.len();
    if pending[..end].ends_with(b"\n") {
        end -= 1;
    }
    if pending[..end].ends_with(b"\r") {
        end -= 1;
    }
    session.console.line(&String::from_utf8_lossy(&pending[..end]));
    pending.clear();
}

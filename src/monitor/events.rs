//! Events for the serial monitor state machine.
//!
//! This modules is private and restricted to the [`monitor`](crate::monitor)
//! scope. The public interface of the state machine is provided by
//! [`monitor`](crate::monitor).
//!
//! ```ignore
//! use super::events::*;
//! ```
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::{fmt, io::Read};

use crate::{settings::MonitorSettings, utils::PortCandidate};

// =============================================================================
// Crate-Public Interface
// =============================================================================

// ScanEvent ===================================================================

/// Event fired to trigger a transition to the `Scanning` state.
///
/// This event can happen under one of the following circumstances:
///
///  1. A scan found no port at all. Devices come and go, so we just scan
///     again after a short pause.
///  2. The selected port could not be opened.
///  3. A connection was closed after a read error or the end of the stream.
#[derive(Debug)]
pub(crate) struct ScanEvent {
    pub settings: MonitorSettings,
}

// PortsFoundEvent =============================================================

/// Event fired when a scan found at least one port, available or busy. It
/// triggers a transition to the `AwaitingSelection` state.
#[derive(Debug)]
pub(crate) struct PortsFoundEvent {
    pub settings: MonitorSettings,
    pub ports: Vec<PortCandidate>,
}

// PortSelectedEvent ===========================================================

/// Event fired once the user entered a port name and a baud rate, both
/// recorded in `settings`. It triggers a transition to the `Connecting` state.
#[derive(Debug)]
pub(crate) struct PortSelectedEvent {
    pub settings: MonitorSettings,
}

// ConnectedEvent ==============================================================

/// Event fired when the selected port was opened. It triggers a transition to
/// the `Streaming` state.
pub(crate) struct ConnectedEvent {
    pub settings: MonitorSettings,
    /// The open port. Consumed and moved to the next state.
    pub port: Box<dyn Read + Send>,
}
impl fmt::Debug for ConnectedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedEvent")
            .field("settings", &self.settings)
            .finish()
    }
}

// ConnectionLostEvent =========================================================

/// Event fired when reading from the port failed or the stream ended. It
/// triggers a transition to the `Closed` state.
#[derive(Debug)]
pub(crate) struct ConnectionLostEvent {
    pub settings: MonitorSettings,
    pub reason: String,
}

// InterruptEvent ==============================================================

/// Event fired when the user asked the monitor to terminate. It can happen
/// from any state and triggers a transition to the `Done` state.
#[derive(Debug)]
pub(crate) struct InterruptEvent {
    pub settings: MonitorSettings,
}

// ExitEvent ===================================================================

/// The last event of the monitor. It results in the event loop terminating
/// with the interrupt exit status.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub settings: MonitorSettings,
}

// Events enum ==================================================================

/// Events that can be triggered within the monitor state machine.
///
/// Each possible value holds an `event`, which in turn may hold additional data
/// for the state transition. Such data is passed by the origin state for
/// potential use by the target state.
#[derive(Debug)]
pub(crate) enum Event {
    Scan(ScanEvent),
    PortsFound(PortsFoundEvent),
    PortSelected(PortSelectedEvent),
    Connected(ConnectedEvent),
    ConnectionLost(ConnectionLostEvent),
    Interrupt(InterruptEvent),
    Exit(ExitEvent),
}

//! Serial monitor connection management.
//!
//! Devices are plugged, unplugged and reset while the monitor runs. Rather
//! than giving up when that happens, the monitor goes back to scanning the
//! ports and asks the user again which one to open, for as long as it is not
//! interrupted.
//!
//! The following state diagram summarizes the different states and transitions
//! the monitor goes through:
//!
//! ```text
//!                     START
//!                       |
//!        no ports       v
//!           .----> .----------.  <------------------------.
//!           '------| Scanning |  <--------.               |
//!                  '----------'           |               |
//!                       | ports found     | open          |
//!                       v                 | failed        |
//!             .-------------------.       |               |
//!             | AwaitingSelection |       |               |
//!             '-------------------'       |               |
//!                       | port + baud     |               |
//!                       v                 |               |
//!                .------------.           |               |
//!                | Connecting |-----------'               |
//!                '------------'                           |
//!                       | open                            |
//!                       v                                 |
//!                .-----------.  read error  .--------.    |
//!                | Streaming |------------->| Closed |----'
//!                '-----------'  end of data '--------'
//!
//!   interrupt, checked before every state runs and while streaming
//!   or waiting:
//!                  (any state) ----------> .------.
//!                                          | Done | --> END (status 130)
//!                                          '------'
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::debug;

use super::events::*;
use super::states::*;
use crate::{
    settings::MonitorSettings,
    utils::{Console, PortBackend},
};

/// Exit status of the monitor when it was interrupted by the user.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

// =============================================================================
// Public Interface
// =============================================================================

/// The serial monitor. Use the [`factory`] function to get an instance then
/// run it by calling its `run()` method.
pub struct Monitor {
    sm: MonitorStates,
    session: Session,
}
impl Monitor {
    /// The monitor event loop runs until the user interrupts it, by raising
    /// the `interrupt` flag given to [`factory`]. At such point, the event
    /// loop terminates and returns [`INTERRUPT_EXIT_CODE`], to be used as the
    /// process exit status.
    pub fn run(&mut self) -> i32 {
        loop {
            if self.session.interrupted() && !matches!(self.sm, MonitorStates::Done(_)) {
                debug!("interrupt received");
                let settings = self.sm.settings().clone();
                self.sm = MonitorStates::Done(InterruptEvent { settings }.into());
            }

            self.sm = self.sm.step(&mut self.session);
            if let MonitorStates::Done(sm) = &self.sm {
                if sm.state.should_exit {
                    return INTERRUPT_EXIT_CODE;
                }
            }
        }
    }
}

/// Factory function for the serial monitor.
///
/// The `interrupt` flag is meant to be raised from a signal handler installed
/// once for the whole process; the monitor checks it before running each
/// state, while streaming and while waiting.
///
/// **Example**
/// ```no_run
/// use std::sync::{atomic::AtomicBool, Arc};
/// use avrkit::{monitor, MonitorSettingsBuilder, SystemPorts, Terminal};
///
/// let interrupt = Arc::new(AtomicBool::new(false));
/// let mut monitor = monitor::factory(
///     MonitorSettingsBuilder::new().finalize(),
///     Box::new(SystemPorts),
///     Box::new(Terminal::new(interrupt.clone())),
///     interrupt,
/// );
/// std::process::exit(monitor.run());
/// ```
pub fn factory(
    settings: MonitorSettings,
    backend: Box<dyn PortBackend>,
    console: Box<dyn Console>,
    interrupt: Arc<AtomicBool>,
) -> Monitor {
    Monitor {
        // The monitor naturally starts by scanning the ports.
        sm: MonitorStates::Scanning(MonitorSM::new(settings)),
        session: Session {
            backend,
            console,
            interrupt,
        },
    }
}

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// The collaborators shared by all states: the ports, the user's terminal and
/// the interrupt flag.
pub(crate) struct Session {
    pub backend: Box<dyn PortBackend>,
    pub console: Box<dyn Console>,
    pub interrupt: Arc<AtomicBool>,
}
impl Session {
    pub fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// The raw state machine implementing the monitor.
///
/// Note that using a generic type that holds the current state serves two
/// purposes. It allows for also having shared data by all states that is not
/// really part of state data (e.g. state machine parameters, statistics,
/// etc...). Additionally, it's nicer when debugging to see the state machine
/// and the current state it is holding at any time.
#[derive(Debug)]
struct MonitorSM<S: Runnable> {
    settings: MonitorSettings,
    state: S,
}
impl<S: Runnable> MonitorSM<S> {
    fn run(&mut self, session: &mut Session) -> Event {
        self.state.run(&self.settings, session)
    }
}

/// The state machine starts in the `ScanningState`.
impl MonitorSM<ScanningState> {
    fn new(settings: MonitorSettings) -> Self {
        MonitorSM {
            settings,
            state: ScanningState {},
        }
    }
}

/// An enum wrapper around the states of the monitor state machine. It
/// provides a simpler and more intuitive model for manipulating states and
/// their transitions.
enum MonitorStates {
    Scanning(MonitorSM<ScanningState>),
    AwaitingSelection(MonitorSM<AwaitingSelectionState>),
    Connecting(MonitorSM<ConnectingState>),
    Streaming(MonitorSM<StreamingState>),
    Closed(MonitorSM<ClosedState>),
    Done(MonitorSM<DoneState>),
}
impl MonitorStates {
    fn settings(&self) -> &MonitorSettings {
        match self {
            MonitorStates::Scanning(sm) => &sm.settings,
            MonitorStates::AwaitingSelection(sm) => &sm.settings,
            MonitorStates::Connecting(sm) => &sm.settings,
            MonitorStates::Streaming(sm) => &sm.settings,
            MonitorStates::Closed(sm) => &sm.settings,
            MonitorStates::Done(sm) => &sm.settings,
        }
    }

    /// The unit of work in the state machine event loop. It runs the current
    /// state and decides the next transition from the event it returns. State
    /// transitions from events are implemented using the rust `From`/`Into`
    /// pattern. Most of the potential errors of state/event/transition
    /// mismatches can be caught at compile time.
    fn step(&mut self, session: &mut Session) -> Self {
        match self {
            MonitorStates::Scanning(sm) => {
                let event = sm.run(session);
                match event {
                    Event::Scan(ev) => MonitorStates::Scanning(ev.into()),
                    Event::PortsFound(ev) => MonitorStates::AwaitingSelection(ev.into()),
                    Event::Interrupt(ev) => MonitorStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            MonitorStates::AwaitingSelection(sm) => {
                let event = sm.run(session);
                match event {
                    Event::PortSelected(ev) => MonitorStates::Connecting(ev.into()),
                    Event::Interrupt(ev) => MonitorStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            MonitorStates::Connecting(sm) => {
                let event = sm.run(session);
                match event {
                    Event::Connected(ev) => MonitorStates::Streaming(ev.into()),
                    Event::Scan(ev) => MonitorStates::Scanning(ev.into()),
                    Event::Interrupt(ev) => MonitorStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            MonitorStates::Streaming(sm) => {
                let event = sm.run(session);
                match event {
                    Event::ConnectionLost(ev) => MonitorStates::Closed(ev.into()),
                    Event::Interrupt(ev) => MonitorStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            MonitorStates::Closed(sm) => {
                let event = sm.run(session);
                match event {
                    Event::Scan(ev) => MonitorStates::Scanning(ev.into()),
                    Event::Interrupt(ev) => MonitorStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
            MonitorStates::Done(sm) => {
                let event = sm.run(session);
                match event {
                    Event::Exit(ev) => MonitorStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, sm),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<ScanEvent> for MonitorSM<ScanningState> {
    fn from(event: ScanEvent) -> MonitorSM<ScanningState> {
        MonitorSM {
            settings: event.settings,
            state: ScanningState {},
        }
    }
}

impl From<PortsFoundEvent> for MonitorSM<AwaitingSelectionState> {
    fn from(event: PortsFoundEvent) -> MonitorSM<AwaitingSelectionState> {
        MonitorSM {
            settings: event.settings,
            state: AwaitingSelectionState { ports: event.ports },
        }
    }
}

impl From<PortSelectedEvent> for MonitorSM<ConnectingState> {
    fn from(event: PortSelectedEvent) -> MonitorSM<ConnectingState> {
        MonitorSM {
            settings: event.settings,
            state: ConnectingState {},
        }
    }
}

impl From<ConnectedEvent> for MonitorSM<StreamingState> {
    fn from(event: ConnectedEvent) -> MonitorSM<StreamingState> {
        MonitorSM {
            settings: event.settings,
            state: StreamingState {
                port: Some(event.port),
            },
        }
    }
}

impl From<ConnectionLostEvent> for MonitorSM<ClosedState> {
    fn from(event: ConnectionLostEvent) -> MonitorSM<ClosedState> {
        MonitorSM {
            settings: event.settings,
            state: ClosedState {
                reason: event.reason,
            },
        }
    }
}

impl From<InterruptEvent> for MonitorSM<DoneState> {
    fn from(event: InterruptEvent) -> MonitorSM<DoneState> {
        MonitorSM {
            settings: event.settings,
            state: DoneState { should_exit: false },
        }
    }
}
impl From<ExitEvent> for MonitorSM<DoneState> {
    fn from(event: ExitEvent) -> MonitorSM<DoneState> {
        MonitorSM {
            settings: event.settings,
            state: DoneState { should_exit: true },
        }
    }
}

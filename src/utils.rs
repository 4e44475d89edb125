//! Helpers to deal with serial ports and with the user's terminal.

mod console;
mod ports;

pub use console::{Console, Terminal};
pub use ports::{
    candidate_names, classify_open_error, scan, PortBackend, PortCandidate, PortStatus,
    SystemPorts,
};

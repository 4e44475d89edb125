//! Serial port device scanning and opening.

use std::{fmt, io, io::Read};

use log::{debug, info, trace};
use serialport::{available_ports, ErrorKind, SerialPort};

use crate::settings::MonitorSettings;

#[cfg(windows)]
const PREFIXES: &[&str] = &["COM"];
#[cfg(windows)]
const INDICES: std::ops::RangeInclusive<u32> = 1..=64;

#[cfg(not(windows))]
const PREFIXES: &[&str] = &["/dev/ttyUSB", "/dev/ttyACM"];
#[cfg(not(windows))]
const INDICES: std::ops::RangeInclusive<u32> = 0..=31;

/// Baud rate used when probing; the value is irrelevant to the outcome.
const PROBE_BAUD_RATE: u32 = 9_600;

//==============================================================================
// Public Interface
//==============================================================================

/// Whether a port that exists can be used right now.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PortStatus {
    Available,
    /// The port exists but another process holds it, or we may not open it.
    Busy,
}

/// A port found by [`scan`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PortCandidate {
    pub name: String,
    pub status: PortStatus,
}

impl fmt::Display for PortCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            PortStatus::Available => write!(f, "{}", self.name),
            PortStatus::Busy => write!(f, "{} (busy)", self.name),
        }
    }
}

/// Access to the serial ports of the system.
pub trait PortBackend {
    /// Port names worth probing, in the order they should be reported.
    fn candidates(&mut self) -> Vec<String>;

    /// Open the port and close it again right away.
    fn probe(&mut self, name: &str) -> Result<(), serialport::Error>;

    /// Open the port named in `settings` for reading. Reads on the returned
    /// handle give up with [`io::ErrorKind::TimedOut`] after
    /// [`MonitorSettings::read_timeout`].
    fn open(&mut self, settings: &MonitorSettings) -> Result<Box<dyn Read + Send>, serialport::Error>;
}

/// Map an open failure to the status of the port. `None` means the port does
/// not exist.
pub fn classify_open_error(error: &serialport::Error) -> Option<PortStatus> {
    match error.kind() {
        ErrorKind::Io(io::ErrorKind::PermissionDenied)
        | ErrorKind::Io(io::ErrorKind::AddrInUse)
        | ErrorKind::Io(io::ErrorKind::WouldBlock) => Some(PortStatus::Busy),
        _ => {
            let description = error.description.to_lowercase();
            if ["busy", "denied", "in use"]
                .iter()
                .any(|hint| description.contains(hint))
            {
                Some(PortStatus::Busy)
            } else {
                None
            }
        }
    }
}

/// Probe every candidate of the backend and keep the ones that exist. An
/// empty result is a normal outcome.
pub fn scan(backend: &mut dyn PortBackend) -> Vec<PortCandidate> {
    let mut found = Vec::new();
    for name in backend.candidates() {
        match backend.probe(&name) {
            Ok(()) => {
                trace!("{}: available", name);
                found.push(PortCandidate {
                    name,
                    status: PortStatus::Available,
                });
            }
            Err(ref e) => match classify_open_error(e) {
                Some(status) => {
                    debug!("{}: busy ({})", name, e);
                    found.push(PortCandidate { name, status });
                }
                None => trace!("{}: absent ({})", name, e),
            },
        }
    }
    info!("{} serial port(s) found", found.len());
    found
}

/// The bounded range of port names probed on this platform.
pub fn candidate_names() -> Vec<String> {
    PREFIXES
        .iter()
        .flat_map(|prefix| INDICES.map(move |index| format!("{}{}", prefix, index)))
        .collect()
}

/// The serial ports of the host, through the `serialport` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortBackend for SystemPorts {
    fn candidates(&mut self) -> Vec<String> {
        let mut names = candidate_names();
        // Devices with other naming schemes (e.g. `/dev/cu.usbmodem14101`).
        match available_ports() {
            Ok(ports) => {
                for port in ports {
                    if !names.contains(&port.port_name) {
                        names.push(port.port_name);
                    }
                }
            }
            Err(ref e) => {
                debug!("error: {}", e);
            }
        }
        names
    }

    fn probe(&mut self, name: &str) -> Result<(), serialport::Error> {
        serialport::new(name, PROBE_BAUD_RATE).open().map(drop)
    }

    fn open(&mut self, settings: &MonitorSettings) -> Result<Box<dyn Read + Send>, serialport::Error> {
        let path = settings.path.clone().ok_or_else(|| {
            serialport::Error::new(ErrorKind::InvalidInput, "no serial port selected")
        })?;
        let port = serialport::new(&path, settings.baud_rate)
            .data_bits(settings.data_bits())
            .stop_bits(settings.stop_bits())
            .parity(settings.parity())
            .flow_control(settings.flow_control())
            .timeout(settings.read_timeout)
            .open()?;

        info!(
            "Connected to {} at {} baud",
            port.name().unwrap_or_else(|| path.clone()),
            settings.baud_rate
        );
        Ok(Box::new(PortReader { port }))
    }
}

//==============================================================================
// Private stuff
//==============================================================================

struct PortReader {
    port: Box<dyn SerialPort>,
}

impl Read for PortReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePorts {
        outcomes: Vec<(&'static str, Option<serialport::Error>)>,
    }

    impl PortBackend for FakePorts {
        fn candidates(&mut self) -> Vec<String> {
            self.outcomes.iter().map(|(n, _)| n.to_string()).collect()
        }

        fn probe(&mut self, name: &str) -> Result<(), serialport::Error> {
            let (_, outcome) = self.outcomes.iter().find(|(n, _)| *n == name).unwrap();
            match outcome {
                None => Ok(()),
                Some(e) => Err(e.clone()),
            }
        }

        fn open(&mut self, _: &MonitorSettings) -> Result<Box<dyn Read + Send>, serialport::Error> {
            unreachable!()
        }
    }

    fn error(kind: ErrorKind, description: &str) -> serialport::Error {
        serialport::Error::new(kind, description)
    }

    #[test]
    fn busy_ports_are_reported_absent_ones_omitted() {
        let mut ports = FakePorts {
            outcomes: vec![
                ("COM1", Some(error(ErrorKind::NoDevice, "not found"))),
                ("COM3", None),
                ("COM4", Some(error(ErrorKind::Io(io::ErrorKind::PermissionDenied), "denied"))),
                ("COM5", Some(error(ErrorKind::Unknown, "Device or resource busy"))),
            ],
        };
        assert_eq!(
            scan(&mut ports),
            vec![
                PortCandidate {
                    name: "COM3".into(),
                    status: PortStatus::Available
                },
                PortCandidate {
                    name: "COM4".into(),
                    status: PortStatus::Busy
                },
                PortCandidate {
                    name: "COM5".into(),
                    status: PortStatus::Busy
                },
            ]
        );
    }

    #[test]
    fn nothing_found_is_empty() {
        let mut ports = FakePorts { outcomes: vec![] };
        assert!(scan(&mut ports).is_empty());
    }

    #[test]
    fn classification() {
        assert_eq!(
            classify_open_error(&error(ErrorKind::Io(io::ErrorKind::AddrInUse), "")),
            Some(PortStatus::Busy)
        );
        assert_eq!(
            classify_open_error(&error(ErrorKind::NoDevice, "Access is denied.")),
            Some(PortStatus::Busy)
        );
        assert_eq!(
            classify_open_error(&error(ErrorKind::Io(io::ErrorKind::NotFound), "No such file")),
            None
        );
        assert_eq!(
            classify_open_error(&error(ErrorKind::InvalidInput, "bad name")),
            None
        );
    }

    #[test]
    fn candidate_range_is_bounded() {
        let names = candidate_names();
        assert_eq!(names.len(), PREFIXES.len() * INDICES.count());
        assert!(names.iter().all(|n| PREFIXES.iter().any(|p| n.starts_with(p))));
    }

    #[test]
    fn busy_ports_are_marked() {
        let busy = PortCandidate {
            name: "COM7".into(),
            status: PortStatus::Busy,
        };
        assert_eq!(busy.to_string(), "COM7 (busy)");
    }
}

//! Settings of the serial monitor.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values. The line framing is fixed to 8 data
//! bits, 1 stop bit and no parity and cannot be changed.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

/// Number of bits per character, fixed.
pub const DATA_BITS: DataBits = DataBits::Eight;
/// Number of stop bits, fixed.
pub const STOP_BITS: StopBits = StopBits::One;
/// Parity checking, fixed.
pub const PARITY: Parity = Parity::None;

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings related to the serial port used by the monitor and
/// acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MonitorSettings {
    /// The port name, usually the device path. Set once the user picked one.
    pub path: Option<String>,
    /// The baud rate in symbols-per-second. `0` is passed as is to the port
    /// layer, which rejects it when opening.
    pub baud_rate: u32,
    /// How long a read may block before the interrupt flag is checked again.
    pub read_timeout: Duration,
    /// Pause before scanning again after an empty scan or a failed connection.
    pub retry_delay: Duration,

    /// Restrict creation of `MonitorSettings` instances unless through the
    /// `MonitorSettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

impl MonitorSettings {
    pub fn data_bits(&self) -> DataBits {
        DATA_BITS
    }

    pub fn stop_bits(&self) -> StopBits {
        STOP_BITS
    }

    pub fn parity(&self) -> Parity {
        PARITY
    }

    pub fn flow_control(&self) -> FlowControl {
        FlowControl::None
    }
}

/// The builder for the `MonitorSettings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use avrkit::MonitorSettingsBuilder;
///
/// let settings = MonitorSettingsBuilder::new()
///     .path("/dev/ttyACM0")
///     .baud_rate(9600)
///     .finalize();
/// assert_eq!(settings.baud_rate, 9600);
/// ```
pub struct MonitorSettingsBuilder {
    settings: MonitorSettings,
}

impl Default for MonitorSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorSettingsBuilder {
    /// Start building the settings using default values and no path for the
    /// port.
    pub fn new() -> Self {
        MonitorSettingsBuilder {
            settings: MonitorSettings {
                path: None,
                baud_rate: 9_600,
                read_timeout: Duration::from_millis(100),
                retry_delay: Duration::from_secs(1),
                _private_use_builder: (),
            },
        }
    }

    /// Start from existing settings, e.g. to change the port on reconnection.
    pub fn from_settings(settings: MonitorSettings) -> Self {
        MonitorSettingsBuilder { settings }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().as_ref().to_owned());
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = baud_rate;
        self
    }

    /// Set the longest time a single read may block
    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.settings.read_timeout = read_timeout;
        self
    }

    /// Set the pause between unsuccessful scan or connection attempts
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.settings.retry_delay = retry_delay;
        self
    }

    pub fn finalize(self) -> MonitorSettings {
        self.settings
    }
}

/// Interpret the baud rate typed by the user: leading digits are used, any
/// other input gives `0`.
pub fn parse_baud_rate(input: &str) -> u32 {
    let digits: String = input
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = MonitorSettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        MonitorSettings {
            path: None,
            baud_rate: 9_600,
            read_timeout: Duration::from_millis(100),
            retry_delay: Duration::from_secs(1),
            _private_use_builder: (),
        }
    )
}

#[test]
fn fixed_framing() {
    let settings = MonitorSettingsBuilder::new().finalize();
    assert_eq!(settings.data_bits(), DataBits::Eight);
    assert_eq!(settings.stop_bits(), StopBits::One);
    assert_eq!(settings.parity(), Parity::None);
    assert_eq!(settings.flow_control(), FlowControl::None);
}

#[test]
fn path() {
    let settings = MonitorSettingsBuilder::new().path("COM4").finalize();
    assert_eq!(settings.path.unwrap(), "COM4");
}

#[test]
fn rebuild_keeps_other_values() {
    let settings = MonitorSettingsBuilder::new()
        .retry_delay(Duration::from_millis(5))
        .finalize();
    let settings = MonitorSettingsBuilder::from_settings(settings)
        .baud_rate(115_200)
        .finalize();
    assert_eq!(settings.baud_rate, 115_200);
    assert_eq!(settings.retry_delay, Duration::from_millis(5));
}

#[test]
fn baud_rate_parsing() {
    assert_eq!(parse_baud_rate("9600\n"), 9600);
    assert_eq!(parse_baud_rate(" 115200 "), 115_200);
    assert_eq!(parse_baud_rate("57600baud"), 57_600);
    assert_eq!(parse_baud_rate("fast"), 0);
    assert_eq!(parse_baud_rate(""), 0);
}

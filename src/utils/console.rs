//! Interaction with the user's terminal.

use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Input};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};

use super::ports::PortCandidate;

const POLL_PERIOD: Duration = Duration::from_millis(50);

// =============================================================================
// Public Interface
// =============================================================================

/// Everything the monitor shows to, or asks from, the user.
pub trait Console {
    /// Ask for one line of input. `None` when no input could be read.
    fn prompt(&mut self, message: &str) -> Option<String>;

    /// Show the ports found by a scan.
    fn show_ports(&mut self, ports: &[PortCandidate]);

    /// Emit one line received from the device, verbatim.
    fn line(&mut self, line: &str);

    /// Show a status message.
    fn notice(&mut self, message: &str);

    /// Pause for `period` while telling the user why. Returns early when
    /// `interrupt` is raised.
    fn wait(&mut self, message: &str, period: Duration, interrupt: &AtomicBool);
}

/// The interactive terminal: received lines go to standard output, everything
/// else to standard error.
pub struct Terminal {
    term: Term,
    interrupt: Arc<AtomicBool>,
}

impl Terminal {
    /// `interrupt` is raised when the user hits Ctrl+C while typing an answer
    /// to a prompt.
    pub fn new(interrupt: Arc<AtomicBool>) -> Self {
        Terminal {
            term: Term::stderr(),
            interrupt,
        }
    }
}

impl Console for Terminal {
    fn prompt(&mut self, message: &str) -> Option<String> {
        if !self.term.is_term() {
            eprintln!("{}", message);
            let mut answer = String::new();
            return match io::stdin().read_line(&mut answer) {
                Ok(0) => None,
                Ok(_) => Some(answer.trim_end().to_string()),
                Err(ref e) => {
                    debug!("error: {}", e);
                    None
                }
            };
        }

        let answer = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .allow_empty(true)
            .interact_text_on(&self.term);
        match answer {
            Ok(answer) => Some(answer),
            Err(dialoguer::Error::IO(ref e)) if e.kind() == io::ErrorKind::Interrupted => {
                info!("prompt interrupted");
                self.interrupt.store(true, Ordering::SeqCst);
                None
            }
            Err(ref e) => {
                debug!("error: {}", e);
                None
            }
        }
    }

    fn show_ports(&mut self, ports: &[PortCandidate]) {
        eprintln!("\n{}", style("Available Serial Ports:").bold());
        for port in ports {
            eprintln!("  {}", style(port).cyan());
        }
    }

    fn line(&mut self, line: &str) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
            debug!("could not write to stdout");
        }
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{}", message);
    }

    fn wait(&mut self, message: &str, period: Duration, interrupt: &AtomicBool) {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_style(
            ProgressStyle::default_spinner()
                // For more spinners check out the cli-spinners project:
                // https://github.com/sindresorhus/cli-spinners/blob/master/spinners.json
                .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
                .template("[MON] {spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());

        let deadline = Instant::now() + period;
        while Instant::now() < deadline && !interrupt.load(Ordering::SeqCst) {
            thread::sleep(POLL_PERIOD.min(deadline.saturating_duration_since(Instant::now())));
        }
        pb.finish_and_clear();
    }
}

//! AVR serial monitor command line interface.

use std::{
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use clap::{crate_authors, crate_version, App, AppSettings::*, Arg};
use console::style;
use log::{debug, trace, LevelFilter};
use simplelog::*;

use avrkit::{self as ak, SystemPorts, Terminal, INTERRUPT_EXIT_CODE};

/// How long the monitor gets to notice an interrupt on its own before the
/// process is terminated from the handler.
const INTERRUPT_GRACE: Duration = Duration::from_millis(500);

fn main() {
    let matches = App::new("avrmon")
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about("Serial monitor for AVR boards")
        .long_about(
            "\n\
            Scans the serial ports of the host, asks which one to open and at \
            which baud rate (8 data bits, 1 stop bit, no parity), then prints \
            every line received from the board.\n\
            \n\
            When the board is unplugged or reset, the monitor goes back to \
            scanning. It only stops on Ctrl+C.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'avrmon -v -v -v' or 'avrmon -vvv' vs 'avrmon -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("{} could not set up logging: {}", style("warning:").yellow(), e);
    }

    trace!("{:#?}", matches);

    eprintln!("{}", style("Press CTRL+C to close").bold());

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        // The monitor exits by itself unless it is stuck in a blocking call.
        thread::sleep(INTERRUPT_GRACE);
        eprintln!("Exiting");
        process::exit(INTERRUPT_EXIT_CODE);
    }) {
        eprintln!("{} could not install the Ctrl+C handler: {}", style("error:").red(), e);
        process::exit(1);
    }

    let mut monitor = ak::factory(
        ak::MonitorSettingsBuilder::default().finalize(),
        Box::new(SystemPorts),
        Box::new(Terminal::new(interrupt.clone())),
        interrupt,
    );
    let exit_code = monitor.run();
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

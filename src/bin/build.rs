//! AVR project build command line interface.

use std::{path::Path, process};

use clap::{crate_authors, crate_version, App, AppSettings::*, Arg};
use console::{style, Term};
use log::{debug, trace, LevelFilter};
use simplelog::*;

use avrkit::{Error, Pipeline, ProcessRunner, Project, Request};

/// Exit status when the command line is missing a required library.
const USAGE_EXIT_CODE: i32 = 2;

const USAGE: &str = "\
usage: avrbuild [-v...] [-c <settings>] [-C <project>] <action> [<library>]

action:
    build       builds the specified library, outputs its archive
    rebuild     cleans then builds the specified library
    clean       cleans .o files from the specified library; with no library,
                removes the firmware .hex and .elf files
    help        prints this message
    <other>     any other action (compile, flash, ...) is handed to the
                project build descriptor, e.g. `compile` builds the .cpp file
                in the project directory and outputs its .elf and .hex files

library:
    <name>      builds, rebuilds or cleans the library in the source folder
    all         builds, rebuilds or cleans every library in the source folder";

fn main() {
    let matches = App::new("avrbuild")
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about("Builds the libraries and firmware of an AVR project")
        .after_help(USAGE)
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("SETTINGS")
                .help("path to the project settings")
                .long_help(
                    "path to the project settings, a TOML file with a single \
                     `[Settings]` table; relative paths are resolved from the \
                     project directory.",
                )
                .short("-c")
                .long("--config")
                .takes_value(true)
                .default_value("bin/settings.toml"),
        )
        .arg(
            Arg::with_name("PROJECT_DIR")
                .help("the project directory")
                .short("-C")
                .long("--project")
                .takes_value(true)
                .default_value("."),
        )
        .arg(
            Arg::with_name("ACTION")
                .help("build, rebuild, clean, help or a project action")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("LIBRARY")
                .help("a library of the source folder, or `all`")
                .index(2),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'avrbuild -v -v -v' or 'avrbuild -vvv' vs 'avrbuild -v'
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

    // It's safe to call unwrap on arguments that are required or have a
    // default value.
    let action = matches.value_of("ACTION").unwrap();
    let library = matches.value_of("LIBRARY");

    if action == "help" {
        println!("{}", USAGE);
        process::exit(0);
    }

    let request = match Request::parse(action, library) {
        Ok(request) => request,
        Err(e @ Error::MissingLibrary(_)) => {
            eprintln!("{} {}\n", style("error:").red().bold(), e);
            eprintln!("{}", USAGE);
            press_any_key();
            process::exit(USAGE_EXIT_CODE);
        }
        Err(e) => fail(&e),
    };
    debug!("{:?}", request);

    let root = Path::new(matches.value_of("PROJECT_DIR").unwrap());
    let settings = Path::new(matches.value_of("SETTINGS").unwrap());
    let project = Project::load(root, settings).unwrap_or_else(|e| fail(&e));

    for (label, value) in project.config().summary() {
        eprintln!("{}: {}", style(label).cyan(), value);
    }

    let mut pipeline = Pipeline::new(&project, ProcessRunner);
    let report = pipeline.execute(&request).unwrap_or_else(|e| fail(&e));

    if !report.is_success() {
        eprintln!();
        for entry in report.failures() {
            eprintln!(
                "{} {} {} {}",
                style("failed:").red().bold(),
                entry.action,
                style(&entry.target).bold(),
                entry.outcome
            );
        }
        process::exit(1);
    }
}

fn fail(error: &Error) -> ! {
    eprintln!("{} {}", style("error:").red().bold(), error);
    process::exit(1);
}

/// Give the user a chance to read the usage when started from a file manager.
fn press_any_key() {
    let term = Term::stderr();
    if !term.is_term() {
        return;
    }
    eprintln!("Press any key to continue");
    if let Err(ref e) = term.read_key() {
        debug!("error: {}", e);
    }
}

//! Flag composition for the toolchain invocations.
//!
//! Pure string assembly: the same configuration always yields the same flags,
//! in the same order.

use std::path::Path;

use crate::config::BuildConfig;

// =============================================================================
// Public Interface
// =============================================================================

/// The three flag strings handed to the external build step.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FlagSet {
    pub c: String,
    pub cpp: String,
    pub ar: String,
}

/// Base compile flags: include paths, target MCU and CPU frequency.
///
/// `shared_outputs` is the output root as seen from the directory where the
/// external step runs.
pub fn compose_base(config: &BuildConfig, shared_outputs: &str) -> String {
    [
        format!("-I{}/include", shared_outputs),
        format!("-I{}/", local(&config.sources)),
        "-I./".to_string(),
        "-I./utility/".to_string(),
        format!("-I{}/{}", local(&config.variants), config.variant),
        format!("-I{}/include", local(&config.outputs)),
        format!("-mmcu={}", config.mcu),
        format!("-DF_CPU={}", config.cpufreq),
    ]
    .join(" ")
}

/// Compose the complete flag set. User overrides from the configuration come
/// after the base flags.
pub fn compose(config: &BuildConfig, shared_outputs: &str) -> FlagSet {
    let base = compose_base(config, shared_outputs);
    FlagSet {
        c: join_flags(&base, &config.cflags),
        cpp: join_flags(&base, &config.cppflags),
        ar: config.arflags.trim().to_string(),
    }
}

/// `-l<name>` for every library, space separated, quotes stripped.
pub fn link_flags(libs: &[String]) -> String {
    libs.iter()
        .map(|lib| lib.replace(|c: char| c == '\'' || c == '"', ""))
        .filter(|lib| !lib.is_empty())
        .map(|lib| format!("-l{}", lib))
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Private stuff
// =============================================================================

/// `./dir` for a directory relative to where the step runs, absolute ones
/// unchanged.
fn local(dir: &str) -> String {
    if Path::new(dir).is_absolute() {
        dir.to_string()
    } else {
        format!("./{}", dir.trim_start_matches("./"))
    }
}

fn join_flags(base: &str, overrides: &str) -> String {
    let overrides = overrides.trim();
    if overrides.is_empty() {
        base.to_string()
    } else {
        format!("{} {}", base, overrides)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

//! Project configuration for the build orchestrator.
//!
//! The settings live in a TOML file with a single `[Settings]` table. Keys keep
//! the upper-case names used by the project's existing settings store:
//!
//! ```toml
//! [Settings]
//! CODENAME = "blink"
//! PROGRAMMER = "arduino"
//! LIBS = "core Wire"
//! COMPORT = "/dev/ttyACM0"
//! VARIANT = "standard"
//! CPUFREQ = "16000000L"
//! MCU = "atmega328p"
//! PARTNO = "m328p"
//! CFLAGS = "-Os"
//! CPPFLAGS = "-Os -fno-exceptions"
//! ARFLAGS = "rcs"
//! SOURCES = "src"
//! OUTPUTS = "out"
//! ```
//!
//! The configuration is resolved once, wrapped into a [`Project`] together with
//! the project root, and handed explicitly to every component that needs it.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Name of the generated build descriptor, both per library and at the root.
pub const DESCRIPTOR_NAME: &str = "Makefile";

// =============================================================================
// Public Interface
// =============================================================================

/// Immutable build settings, resolved once per run.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BuildConfig {
    /// Base name of the firmware entry file (`<CODENAME>.cpp`) and images.
    pub codename: String,
    /// Programmer type handed to the flashing tool.
    pub programmer: String,
    /// Libraries linked into the firmware, in link order.
    #[serde(deserialize_with = "split_words")]
    pub libs: Vec<String>,
    /// Serial port used for flashing.
    pub comport: String,
    /// Board variant, selects `<VARIANTS>/<VARIANT>` headers.
    pub variant: String,
    pub cpufreq: String,
    pub mcu: String,
    /// Device part number for the flashing tool.
    pub partno: String,

    #[serde(default)]
    pub cflags: String,
    #[serde(default)]
    pub cppflags: String,
    #[serde(default)]
    pub arflags: String,

    /// Source root, one sub-directory per library.
    pub sources: String,
    /// Output root, receives `include/`, `lib/` and `codes/`.
    pub outputs: String,

    #[serde(default = "default_cc")]
    pub cc: String,
    #[serde(default = "default_cpp")]
    pub cpp: String,
    #[serde(default = "default_ar")]
    pub ar: String,
    #[serde(rename = "OBJC", default = "default_objcopy")]
    pub objcopy: String,

    /// The external build tool driving the toolchain.
    #[serde(default = "default_make")]
    pub make: String,
    /// Template copied in place as the build descriptor before each
    /// invocation, relative to the project root.
    #[serde(default = "default_template")]
    pub template: String,
    /// Root directory of the board variants, relative to the project root.
    #[serde(default = "default_variants")]
    pub variants: String,
}

impl BuildConfig {
    /// Parse and validate the content of a settings file.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        let file: SettingsFile = toml::from_str(content).map_err(|source| Error::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })?;
        file.settings.validate()?;
        Ok(file.settings)
    }

    /// Read, parse and validate the settings file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Link flags for the configured libraries: `-lcore -lWire`.
    pub fn library_link_flags(&self) -> String {
        crate::build::link_flags(&self.libs)
    }

    /// Label/value pairs describing the configuration, for the start-up
    /// summary.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PROGRAMMER", self.programmer.clone()),
            ("COMPORT", self.comport.clone()),
            ("MCU", self.mcu.clone()),
            ("LIBS", self.libs.join(" ")),
            ("PARTNO", self.partno.clone()),
            ("CPU Frequency", self.cpufreq.clone()),
            ("CFLAGS", self.cflags.clone()),
            ("CPPFLAGS", self.cppflags.clone()),
            ("ARFLAGS", self.arflags.clone()),
            ("Source Folder", self.sources.clone()),
            ("Output Folder", self.outputs.clone()),
        ]
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("CODENAME", &self.codename),
            ("PROGRAMMER", &self.programmer),
            ("COMPORT", &self.comport),
            ("VARIANT", &self.variant),
            ("CPUFREQ", &self.cpufreq),
            ("MCU", &self.mcu),
            ("PARTNO", &self.partno),
            ("SOURCES", &self.sources),
            ("OUTPUTS", &self.outputs),
            ("CC", &self.cc),
            ("CPP", &self.cpp),
            ("AR", &self.ar),
            ("OBJC", &self.objcopy),
            ("MAKE", &self.make),
            ("TEMPLATE", &self.template),
            ("VARIANTS", &self.variants),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(Error::EmptySetting(key));
            }
        }
        Ok(())
    }
}

/// The resolved configuration anchored at a project root directory. All paths
/// handed out are rooted at [`Project::root`].
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: BuildConfig,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>, config: BuildConfig) -> Self {
        Project {
            root: root.into(),
            config,
        }
    }

    /// Load the settings file (relative paths are taken from `root`) and
    /// anchor the result at `root`.
    pub fn load(root: impl Into<PathBuf>, settings: &Path) -> Result<Self> {
        let root = root.into();
        let config = BuildConfig::load(&root.join(settings))?;
        Ok(Project::new(root, config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join(&self.config.sources)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(&self.config.outputs)
    }

    pub fn library_dir(&self, name: &str) -> PathBuf {
        self.sources_dir().join(name)
    }

    pub fn variant_dir(&self) -> PathBuf {
        self.root
            .join(&self.config.variants)
            .join(&self.config.variant)
    }

    pub fn template_path(&self) -> PathBuf {
        self.root.join(&self.config.template)
    }

    pub fn root_descriptor(&self) -> PathBuf {
        self.root.join(DESCRIPTOR_NAME)
    }

    pub fn library_descriptor(&self, name: &str) -> PathBuf {
        self.library_dir(name).join(DESCRIPTOR_NAME)
    }

    /// The output root as seen from inside a library directory, where the
    /// external step runs: `../../out` for `SOURCES = "src"`.
    ///
    /// An absolute `OUTPUTS` is returned as is. When the source root is
    /// absolute or climbs out with `..`, there is no fixed way back from the
    /// library directory and the absolute output root is returned instead.
    pub fn outputs_from_library(&self) -> String {
        if Path::new(&self.config.outputs).is_absolute() {
            return self.config.outputs.clone();
        }

        let mut depth = 1;
        for component in Path::new(&self.config.sources).components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                _ => {
                    let outputs = self.outputs_dir();
                    return std::path::absolute(&outputs)
                        .unwrap_or(outputs)
                        .to_string_lossy()
                        .into_owned();
                }
            }
        }
        let mut relative = "../".repeat(depth);
        relative.push_str(self.config.outputs.trim_start_matches("./"));
        relative
    }
}

// =============================================================================
// Private stuff
// =============================================================================

#[derive(Deserialize)]
struct SettingsFile {
    #[serde(rename = "Settings")]
    settings: BuildConfig,
}

fn split_words<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.split_whitespace().map(String::from).collect())
}

fn default_cc() -> String {
    "avr-gcc".into()
}

fn default_cpp() -> String {
    "avr-g++".into()
}

fn default_ar() -> String {
    "avr-ar".into()
}

fn default_objcopy() -> String {
    "avr-objcopy".into()
}

fn default_make() -> String {
    "make".into()
}

fn default_template() -> String {
    "bin/template.makefile".into()
}

fn default_variants() -> String {
    "variants".into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"
[Settings]
CODENAME = "blink"
PROGRAMMER = "arduino"
LIBS = "core  Wire"
COMPORT = "/dev/ttyACM0"
VARIANT = "standard"
CPUFREQ = "16000000L"
MCU = "atmega328p"
PARTNO = "m328p"
CFLAGS = "-Os"
CPPFLAGS = "-Os -fno-exceptions"
ARFLAGS = "rcs"
SOURCES = "src"
OUTPUTS = "out"
"#;

    pub(crate) fn sample_config() -> BuildConfig {
        BuildConfig::from_toml(SAMPLE, Path::new("settings.toml")).unwrap()
    }

    #[test]
    fn parses_sample_with_defaults() {
        let config = sample_config();
        assert_eq!(config.codename, "blink");
        assert_eq!(config.libs, vec!["core".to_string(), "Wire".to_string()]);
        assert_eq!(config.cc, "avr-gcc");
        assert_eq!(config.cpp, "avr-g++");
        assert_eq!(config.ar, "avr-ar");
        assert_eq!(config.objcopy, "avr-objcopy");
        assert_eq!(config.make, "make");
        assert_eq!(config.template, "bin/template.makefile");
        assert_eq!(config.variants, "variants");
    }

    #[test]
    fn flags_may_be_omitted() {
        let content: String = SAMPLE
            .lines()
            .filter(|l| !l.contains("FLAGS"))
            .collect::<Vec<_>>()
            .join("\n");
        let config = BuildConfig::from_toml(&content, Path::new("settings.toml")).unwrap();
        assert_eq!(config.cflags, "");
        assert_eq!(config.cppflags, "");
        assert_eq!(config.arflags, "");
    }

    #[test]
    fn missing_key_is_a_parse_error() {
        let content = SAMPLE.replace("MCU = \"atmega328p\"\n", "");
        match BuildConfig::from_toml(&content, Path::new("settings.toml")) {
            Err(Error::ConfigParse { source, .. }) => {
                assert!(source.to_string().contains("MCU"))
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn empty_required_key_is_rejected() {
        let content = SAMPLE.replace("PARTNO = \"m328p\"", "PARTNO = \"  \"");
        match BuildConfig::from_toml(&content, Path::new("settings.toml")) {
            Err(Error::EmptySetting(key)) => assert_eq!(key, "PARTNO"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        match Project::load(dir.path(), Path::new("bin/settings.toml")) {
            Err(Error::ConfigRead { path, .. }) => {
                assert!(path.ends_with("bin/settings.toml"))
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn project_paths_are_rooted() {
        let project = Project::new("/work/blink", sample_config());
        assert_eq!(project.sources_dir(), Path::new("/work/blink/src"));
        assert_eq!(project.outputs_dir(), Path::new("/work/blink/out"));
        assert_eq!(
            project.library_descriptor("Wire"),
            Path::new("/work/blink/src/Wire/Makefile")
        );
        assert_eq!(
            project.variant_dir(),
            Path::new("/work/blink/variants/standard")
        );
        assert_eq!(project.root_descriptor(), Path::new("/work/blink/Makefile"));
    }

    #[test]
    fn outputs_relative_to_library_follow_source_depth() {
        let mut config = sample_config();
        assert_eq!(
            Project::new("/p", config.clone()).outputs_from_library(),
            "../../out"
        );
        config.sources = "./lib/src".into();
        config.outputs = "./build".into();
        assert_eq!(
            Project::new("/p", config).outputs_from_library(),
            "../../../build"
        );
    }

    #[cfg(unix)]
    #[test]
    fn absolute_outputs_are_kept_from_library() {
        let mut config = sample_config();
        config.outputs = "/srv/fw/out".into();
        let project = Project::new("/p", config);
        assert_eq!(project.outputs_dir(), Path::new("/srv/fw/out"));
        assert_eq!(project.outputs_from_library(), "/srv/fw/out");
    }

    #[cfg(unix)]
    #[test]
    fn sources_outside_the_root_use_the_absolute_outputs() {
        let mut config = sample_config();
        config.sources = "../shared/src".into();
        assert_eq!(
            Project::new("/p/app", config.clone()).outputs_from_library(),
            "/p/app/out"
        );
        config.sources = "/opt/avr/libraries".into();
        assert_eq!(
            Project::new("/p/app", config).outputs_from_library(),
            "/p/app/out"
        );
    }

    #[test]
    fn link_flags_follow_libs_order() {
        assert_eq!(sample_config().library_link_flags(), "-lcore -lWire");
    }
}

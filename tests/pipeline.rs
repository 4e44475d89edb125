//! Build pipeline runs against a recording runner standing in for `make`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use avrkit::{
    Action, BuildConfig, BuildReport, Error, Invocation, InvocationOutcome, Pipeline, Project,
    Request, Result, Runner, DESCRIPTOR_NAME,
};
use tempfile::TempDir;

const SETTINGS: &str = r#"
[Settings]
CODENAME = "blink"
PROGRAMMER = "arduino"
LIBS = "core Wire"
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

/// One call seen by the runner, with whether the descriptor it needs was in
/// place at that moment.
#[derive(Debug, Clone)]
struct Call {
    action: String,
    dir: Option<String>,
    outputs: Option<String>,
    cflags: Option<String>,
    descriptor_present: bool,
}

/// Records every invocation and fails the ones whose working directory is in
/// `failing`.
#[derive(Default)]
struct RecordingRunner {
    calls: Vec<Call>,
    failing: Vec<String>,
}

impl Runner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> InvocationOutcome {
        let dir = match invocation.args.first() {
            Some(flag) if flag == "-C" => invocation
                .args
                .get(1)
                .map(|d| d.to_string_lossy().into_owned()),
            _ => None,
        };
        let descriptor = match &dir {
            Some(dir) => invocation.current_dir.join(dir).join(DESCRIPTOR_NAME),
            None => invocation.current_dir.join(DESCRIPTOR_NAME),
        };
        self.calls.push(Call {
            action: invocation
                .action()
                .map(|a| a.to_string_lossy().into_owned())
                .unwrap_or_default(),
            dir: dir.clone(),
            outputs: invocation.parameter("OUTPUTS"),
            cflags: invocation.parameter("CFLAGS"),
            descriptor_present: descriptor.is_file(),
        });

        match dir {
            Some(dir) if self.failing.contains(&dir) => InvocationOutcome::Failed(Some(2)),
            _ => InvocationOutcome::Succeeded,
        }
    }
}

fn project(libraries: &[&str]) -> (TempDir, Project) {
    let root = tempfile::tempdir().unwrap();
    let path = root.path();

    fs::create_dir_all(path.join("bin")).unwrap();
    fs::write(path.join("bin/template.makefile"), "all:\n").unwrap();
    fs::create_dir_all(path.join("variants/standard")).unwrap();
    fs::write(path.join("variants/standard/pins_arduino.h"), "").unwrap();

    for name in libraries {
        let lib = path.join("src").join(name);
        fs::create_dir_all(&lib).unwrap();
        fs::write(lib.join(format!("{}.cpp", name)), "").unwrap();
        fs::write(lib.join(format!("{}.h", name)), "").unwrap();
    }
    fs::create_dir_all(path.join("src")).unwrap();

    let config = BuildConfig::from_toml(SETTINGS, Path::new("settings.toml")).unwrap();
    let project = Project::new(path, config);
    (root, project)
}

fn run(
    project: &Project,
    runner: RecordingRunner,
    request: &Request,
) -> (RecordingRunner, Result<BuildReport>) {
    let mut pipeline = Pipeline::new(project, runner);
    let report = pipeline.execute(request);
    (pipeline.into_runner(), report)
}

fn descriptors_left(root: &Path) -> Vec<PathBuf> {
    let mut left = Vec::new();
    if root.join(DESCRIPTOR_NAME).exists() {
        left.push(root.join(DESCRIPTOR_NAME));
    }
    if let Ok(entries) = fs::read_dir(root.join("src")) {
        for entry in entries.filter_map(|e| e.ok()) {
            let descriptor = entry.path().join(DESCRIPTOR_NAME);
            if descriptor.exists() {
                left.push(descriptor);
            }
        }
    }
    left
}

#[test]
fn build_one_library_runs_init_then_build() {
    let (root, project) = project(&["Wire", "core"]);
    let request = Request::parse("build", Some("Wire")).unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    let report = report.unwrap();

    assert!(report.is_success());
    let actions: Vec<_> = runner.calls.iter().map(|c| c.action.as_str()).collect();
    assert_eq!(actions, vec!["init", "build"]);
    assert!(runner
        .calls
        .iter()
        .all(|c| c.dir.as_deref() == Some("src/Wire") && c.descriptor_present));

    for sub in ["include", "lib", "codes"].iter() {
        assert!(root.path().join("out").join(sub).is_dir());
    }
    assert!(root.path().join("out/include/pins_arduino.h").is_file());
    assert!(descriptors_left(root.path()).is_empty());
}

#[test]
fn descriptor_is_removed_when_the_step_fails() {
    let (root, project) = project(&["Wire"]);
    let runner = RecordingRunner {
        failing: vec!["src/Wire".into()],
        ..Default::default()
    };
    let request = Request::parse("build", Some("Wire")).unwrap();

    let (runner, report) = run(&project, runner, &request);
    let report = report.unwrap();

    assert!(!report.is_success());
    assert_eq!(runner.calls.len(), 2);
    assert!(runner.calls.iter().all(|c| c.descriptor_present));
    assert!(descriptors_left(root.path()).is_empty());
}

#[test]
fn build_all_visits_every_library_in_order() {
    let (root, project) = project(&["core", "Wire", "SPI"]);
    fs::create_dir_all(root.path().join("src/.git")).unwrap();
    fs::write(root.path().join("src/README"), "").unwrap();
    let request = Request::parse("rebuild", Some("all")).unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    assert!(report.unwrap().is_success());

    let calls: Vec<_> = runner
        .calls
        .iter()
        .map(|c| (c.action.as_str(), c.dir.as_deref().unwrap_or("")))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("init", "src/SPI"),
            ("init", "src/Wire"),
            ("init", "src/core"),
            ("rebuild", "src/SPI"),
            ("rebuild", "src/Wire"),
            ("rebuild", "src/core"),
        ]
    );
}

#[test]
fn failures_are_aggregated_without_stopping() {
    let (_root, project) = project(&["core", "Wire"]);
    let runner = RecordingRunner {
        failing: vec!["src/Wire".into()],
        ..Default::default()
    };
    let request = Request::parse("build", Some("all")).unwrap();

    let (runner, report) = run(&project, runner, &request);
    let report = report.unwrap();

    assert_eq!(runner.calls.len(), 4);
    assert_eq!(report.entries.len(), 4);
    let failures: Vec<_> = report
        .failures()
        .map(|e| (e.target.as_str(), e.action.as_str()))
        .collect();
    assert_eq!(failures, vec![("Wire", "init"), ("Wire", "build")]);
    assert!(report
        .entries
        .iter()
        .filter(|e| e.target == "core")
        .all(|e| e.outcome == InvocationOutcome::Succeeded));
}

#[test]
fn unknown_library_is_an_error() {
    let (_root, project) = project(&["core"]);
    let request = Request::parse("build", Some("Servo")).unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    assert!(matches!(report, Err(Error::LibraryNotFound { ref name, .. }) if name == "Servo"));
    assert!(runner.calls.is_empty());
}

#[test]
fn clean_library_runs_a_single_pass() {
    let (_root, project) = project(&["core", "Wire"]);
    let request = Request::parse("clean", Some("all")).unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    assert!(report.unwrap().is_success());
    let actions: Vec<_> = runner.calls.iter().map(|c| c.action.as_str()).collect();
    assert_eq!(actions, vec!["clean", "clean"]);
}

#[test]
fn project_clean_removes_images_and_is_idempotent() {
    let (root, project) = project(&["core"]);
    let request = Request::parse("clean", None).unwrap();

    fs::create_dir_all(root.path().join("out/codes")).unwrap();
    fs::write(root.path().join("out/codes/blink.hex"), "").unwrap();
    fs::write(root.path().join("out/codes/blink.elf"), "").unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    assert!(report.unwrap().is_success());
    assert_eq!(runner.calls.len(), 1);
    assert_eq!(runner.calls[0].action, "clean2");
    assert_eq!(runner.calls[0].dir, None);
    assert!(runner.calls[0].descriptor_present);
    assert!(!root.path().join("out/codes/blink.hex").exists());
    assert!(!root.path().join("out/codes/blink.elf").exists());

    let (_, report) = run(&project, RecordingRunner::default(), &request);
    assert!(report.unwrap().is_success());
    assert!(descriptors_left(root.path()).is_empty());
}

#[test]
fn project_action_runs_once_at_the_root() {
    let (root, project) = project(&["core", "Wire"]);
    let request = Request::parse("flash", None).unwrap();
    assert_eq!(request.action, Action::Project("flash".into()));

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    let report = report.unwrap();

    assert!(report.is_success());
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].target, "<project>");
    assert_eq!(runner.calls.len(), 1);
    assert_eq!(runner.calls[0].action, "flash");
    assert!(runner.calls[0].descriptor_present);
    assert!(descriptors_left(root.path()).is_empty());
}

#[test]
fn missing_template_aborts_before_invoking() {
    let (root, project) = project(&["core"]);
    fs::remove_file(root.path().join("bin/template.makefile")).unwrap();
    let request = Request::parse("build", Some("core")).unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    assert!(matches!(report, Err(Error::Io { .. })));
    assert!(runner.calls.is_empty());
}

#[cfg(unix)]
#[test]
fn build_all_includes_symlinked_libraries() {
    let (root, project) = project(&["core"]);
    let vendor = root.path().join("vendor/Servo");
    fs::create_dir_all(&vendor).unwrap();
    fs::write(vendor.join("Servo.cpp"), "").unwrap();
    std::os::unix::fs::symlink(&vendor, root.path().join("src/Servo")).unwrap();
    let request = Request::parse("build", Some("all")).unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    assert!(report.unwrap().is_success());

    let calls: Vec<_> = runner
        .calls
        .iter()
        .map(|c| (c.action.as_str(), c.dir.as_deref().unwrap_or("")))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("init", "src/Servo"),
            ("init", "src/core"),
            ("build", "src/Servo"),
            ("build", "src/core"),
        ]
    );
    assert!(runner.calls.iter().all(|c| c.descriptor_present));
    assert!(!vendor.join(DESCRIPTOR_NAME).exists());
}

#[test]
fn absolute_outputs_are_shared_by_layout_and_invocations() {
    let (root, _) = project(&["core"]);
    let outputs = tempfile::tempdir().unwrap();
    let outputs_path = outputs.path().to_string_lossy().into_owned();
    let settings = SETTINGS.replace(
        "OUTPUTS = \"out\"",
        &format!("OUTPUTS = '{}'", outputs_path),
    );
    let config = BuildConfig::from_toml(&settings, Path::new("settings.toml")).unwrap();
    let project = Project::new(root.path(), config);
    let request = Request::parse("build", Some("core")).unwrap();

    let (runner, report) = run(&project, RecordingRunner::default(), &request);
    assert!(report.unwrap().is_success());

    for sub in ["include", "lib", "codes"].iter() {
        assert!(outputs.path().join(sub).is_dir());
    }
    assert!(outputs.path().join("include/pins_arduino.h").is_file());
    assert!(!root.path().join("out").exists());

    let include = format!("-I{}/include", outputs_path);
    for call in runner.calls.iter() {
        assert_eq!(call.outputs.as_deref(), Some(outputs_path.as_str()));
        assert!(call.cflags.as_deref().unwrap().starts_with(&include));
    }
}

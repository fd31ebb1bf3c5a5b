//! Shared test infrastructure for integration tests.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Environment variables that would leak the developer's setup into a test run.
const ISOLATED_ENV: [&str; 7] = [
    "ESGW_LM_COMMAND",
    "ESGW_GEMINI_MODEL",
    "ESGW_SINK_URL",
    "ESGW_LANGUAGE",
    "ESGW_LOG",
    "GEMINI_API_KEY",
    "API_KEY",
];

fn manifest_dir() -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()))
}

/// A temp directory holding uploads, outputs and the mock LM's replay queue.
pub struct Workspace {
    pub dir: TempDir,
    responses: usize,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::create_dir_all(dir.path().join("responses")).expect("create responses dir");
        Workspace { dir, responses: 0 }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, body).expect("write workspace file");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read workspace file")
    }

    /// Queue the next LM response (served in order, one per call).
    pub fn add_response(&mut self, body: &str) {
        self.responses += 1;
        self.write(&format!("responses/{:03}.txt", self.responses), body);
    }

    /// Prompts the mock LM received, separated by `---` lines.
    pub fn prompts(&self) -> String {
        fs::read_to_string(self.path("prompts.log")).unwrap_or_default()
    }

    pub fn lm_command(&self) -> String {
        let script = manifest_dir().join("tests/mock-lm.sh");
        format!("sh '{}' '{}'", script.display(), self.dir.path().display())
    }

    /// `esgw` with a clean environment and no user config file.
    pub fn esgw(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_esgw"));
        for key in ISOLATED_ENV {
            cmd.env_remove(key);
        }
        cmd.env("XDG_CONFIG_HOME", self.path("config-home"));
        cmd.env("HOME", self.dir.path());
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run `esgw session` with the mock LM, feeding `script` on stdin.
    pub fn run_session(&self, script: &str, extra_args: &[&str]) -> Output {
        let mut cmd = self.esgw();
        cmd.arg("session")
            .arg("--lm")
            .arg(self.lm_command())
            .args(extra_args);
        run_with_stdin(cmd, script)
    }
}

pub fn run_with_stdin(mut cmd: Command, stdin: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn esgw");
    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(stdin.as_bytes())
        .expect("write script");
    child.wait_with_output().expect("wait for esgw")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Nine roadmap records covering every (category, phase) pair.
pub fn roadmap_response() -> String {
    let phases = [
        "도입기 (2026년)",
        "확산기 (2027년 ~ 2028년)",
        "정착기 (2029년 ~ 2030년)",
    ];
    let mut records = Vec::new();
    for category in ["E", "S", "G"] {
        for phase in phases {
            records.push(serde_json::json!({
                "category": category,
                "year": phase,
                "goal": format!("{category} 목표"),
                "tasks": [format!("{category} 과제 1"), format!("{category} 과제 2")],
            }));
        }
    }
    serde_json::to_string(&records).expect("serialize roadmap")
}

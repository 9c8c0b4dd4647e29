//! Deterministic test doubles shared by the integration tests.
#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use stemwerk::services::{CommandSpec, FileSystem, ProcessError, ProcessOutput, ProcessRunner};
use stemwerk::ui::Prompter;

/// Canned response for a program, keyed by program plus first argument.
#[derive(Debug, Clone)]
pub enum Reply {
    Exit(i32, &'static str),
    Timeout,
    NotFound,
}

/// Records every command and answers from a table; unknown commands fail to spawn.
#[derive(Default)]
pub struct FakeRunner {
    replies: HashMap<String, Vec<Reply>>,
    pub calls: RefCell<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply for `program` when its arguments contain `marker`
    /// (e.g. `"-c"` for probes, `"--check"` for the helper).
    /// Later arguments are matched first, so `"import audio_separator"`
    /// takes precedence over `"-c"` for the same command.
    /// Repeated registrations are consumed in order; the last one sticks.
    pub fn on(mut self, program: &str, marker: &str, reply: Reply) -> Self {
        self.replies
            .entry(format!("{}|{}", program, marker))
            .or_default()
            .push(reply);
        self
    }

    pub fn called_programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.program.clone()).collect()
    }

    pub fn calls_with(&self, marker: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.args.iter().any(|a| a == marker))
            .count()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        self.calls.borrow_mut().push(command.clone());

        let reply = command.args.iter().rev().find_map(|arg| {
            self.replies
                .get(&format!("{}|{}", command.program, arg))
                .map(|replies| {
                    let seen = self
                        .calls
                        .borrow()
                        .iter()
                        .filter(|c| c.program == command.program && c.args.contains(arg))
                        .count();
                    replies[(seen - 1).min(replies.len() - 1)].clone()
                })
        });

        match reply {
            Some(Reply::Exit(code, stdout)) => Ok(ProcessOutput {
                exit_code: Some(code),
                stdout: stdout.to_string(),
                ..ProcessOutput::default()
            }),
            Some(Reply::Timeout) => Err(ProcessError::Timeout(timeout)),
            Some(Reply::NotFound) | None => Err(ProcessError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// In-memory file set.
#[derive(Default)]
pub struct FakeFs {
    files: HashSet<Utf8PathBuf>,
}

impl FakeFs {
    pub fn with_files<I: IntoIterator<Item = &'static str>>(files: I) -> Self {
        Self {
            files: files.into_iter().map(Utf8PathBuf::from).collect(),
        }
    }
}

impl FileSystem for FakeFs {
    fn exists(&self, path: &Utf8Path) -> bool {
        self.files.contains(path)
    }

    fn file_size(&self, path: &Utf8Path) -> Option<u64> {
        self.files.contains(path).then_some(2048)
    }
}

/// Records dialogs and answers confirmations from a queue (default: no).
#[derive(Default)]
pub struct RecordingPrompter {
    answers: RefCell<Vec<bool>>,
    pub confirms: RefCell<Vec<String>>,
    pub infos: RefCell<Vec<String>>,
    pub warnings: RefCell<Vec<String>>,
}

impl RecordingPrompter {
    pub fn answering(answers: &[bool]) -> Self {
        let mut answers = answers.to_vec();
        answers.reverse();
        Self {
            answers: RefCell::new(answers),
            ..Self::default()
        }
    }
}

impl Prompter for RecordingPrompter {
    fn confirm(&self, _title: &str, message: &str) -> bool {
        self.confirms.borrow_mut().push(message.to_string());
        self.answers.borrow_mut().pop().unwrap_or(false)
    }

    fn inform(&self, _title: &str, message: &str) {
        self.infos.borrow_mut().push(message.to_string());
    }

    fn warn(&self, _title: &str, message: &str) {
        self.warnings.borrow_mut().push(message.to_string());
    }

    fn pick_file(&self, _title: &str, _filter_name: &str, _extensions: &[&str]) -> Option<Utf8PathBuf> {
        None
    }
}

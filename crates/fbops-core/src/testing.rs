//! Test doubles shared by the unit tests in this crate.

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::error::{FbopsError, Result};
use crate::runner::{CliCommand, CommandRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Capture,
    Run,
    Probe,
}

type Responder = Box<dyn Fn(&CliCommand) -> Result<String>>;

/// Records every command and answers from a closure.
///
/// `run` and `probe` consult the same closure: `Ok` means exit 0.
pub struct ScriptedRunner {
    respond: Responder,
    pub calls: RefCell<Vec<(Mode, CliCommand)>>,
}

impl ScriptedRunner {
    pub fn new(respond: impl Fn(&CliCommand) -> Result<String> + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls_with(&self, mode: Mode) -> Vec<CliCommand> {
        self.calls
            .borrow()
            .iter()
            .filter(|(m, _)| *m == mode)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn capture(&self, cmd: &CliCommand) -> Result<String> {
        self.calls.borrow_mut().push((Mode::Capture, cmd.clone()));
        (self.respond)(cmd)
    }

    fn run(&self, cmd: &CliCommand) -> Result<()> {
        self.calls.borrow_mut().push((Mode::Run, cmd.clone()));
        (self.respond)(cmd).map(|_| ())
    }

    fn probe(&self, cmd: &CliCommand) -> bool {
        self.calls.borrow_mut().push((Mode::Probe, cmd.clone()));
        (self.respond)(cmd).is_ok()
    }
}

pub fn command_failed(cmd: &CliCommand) -> FbopsError {
    FbopsError::CommandFailed {
        command: cmd.to_string(),
        status: "exit status: 1".to_string(),
        stderr: String::new(),
    }
}

/// Virtual clock: `sleep` advances `now` instantly.
pub struct FakeClock {
    start: Instant,
    offset: Cell<Duration>,
    pub sleeps: RefCell<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + self.offset.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.offset.set(self.offset.get() + duration);
    }
}

pub fn output_of(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

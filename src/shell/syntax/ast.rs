use super::super::state::environment::Environment;
use std::ffi::{OsStr, OsString};
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Runs as a child process.
    External,
    /// Handled inside the shell (`cd`).
    Builtin,
    /// Edits the variable table (`name=value`, `unset`).
    Environment,
}

/// One command of a pipeline. A `None` descriptor means the child inherits
/// the shell's own stdin or stdout; an owned one is closed when the stage is
/// dropped.
#[derive(Debug)]
pub struct Stage {
    pub program: OsString,
    /// Full argument vector; `args[0]` is the program name.
    pub args: Vec<OsString>,
    pub stdin: Option<OwnedFd>,
    pub stdout: Option<OwnedFd>,
    pub background: bool,
    pub kind: StageKind,
    pub env: Environment,
}

impl Stage {
    pub fn new(program: &OsStr) -> Self {
        Stage {
            program: program.to_owned(),
            args: vec![program.to_owned()],
            stdin: None,
            stdout: None,
            background: false,
            kind: StageKind::External,
            env: Environment::new(),
        }
    }

    pub fn is_spawned(&self) -> bool {
        self.kind == StageKind::External
    }

    pub fn stdin_fd(&self) -> Option<RawFd> {
        self.stdin.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn stdout_fd(&self) -> Option<RawFd> {
        self.stdout.as_ref().map(AsRawFd::as_raw_fd)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = RawFd> {
        self.stdin_fd().into_iter().chain(self.stdout_fd())
    }
}

#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Pipeline { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    #[cfg(test)]
    pub fn stages_mut(&mut self) -> &mut [Stage] {
        &mut self.stages
    }

    /// Every descriptor opened for this pipeline. A spawned child closes all
    /// of them once its own ends sit on 0 and 1, otherwise a reader further
    /// down the pipe never sees end-of-file.
    pub fn descriptors(&self) -> Vec<RawFd> {
        self.stages.iter().flat_map(Stage::descriptors).collect()
    }
}

use super::super::error::Error;
use super::super::syntax::ast::{Pipeline, Stage};
use super::super::super::sys;
use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::{CString, OsStr};
use std::io::{self, Write};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::io::RawFd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Foreground,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: usize,
    pub pid: Pid,
    pub program: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Exited(i32),
    Killed(Signal),
    /// The process could not be waited on any more.
    Lost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub job: Job,
    pub status: Status,
}

impl Completion {
    /// The line printed when a background job is observed finishing.
    pub fn report(&self) -> String {
        match self.status {
            Status::Killed(signal) => format!("[{}] Killed ({})  {}", self.job.id, signal, self.job.program),
            _ => format!("[{}] Done  {}", self.job.id, self.job.program),
        }
    }
}

/// Everything a child needs to replace its image, marshalled before the fork.
struct ProcessImage<'p> {
    program: &'p OsStr,
    path: Option<CString>,
    argv: Vec<CString>,
    envp: Vec<CString>,
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
}

impl<'p> ProcessImage<'p> {
    fn prepare(stage: &'p Stage) -> Result<Self, Error> {
        let encoding = |_| Error::StringEncoding(stage.program.to_string_lossy().into_owned());
        let argv = stage
            .args
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(encoding)?;
        let path = match sys::resolve_executable(&stage.program, stage.env.get("PATH")) {
            Some(path) => Some(CString::new(path.into_os_string().into_vec()).map_err(encoding)?),
            None => None,
        };
        Ok(ProcessImage {
            program: &stage.program,
            path,
            argv,
            envp: stage.env.to_cstrings()?,
            stdin: stage.stdin_fd(),
            stdout: stage.stdout_fd(),
        })
    }

    /// Runs in the child: moves the stage's ends onto stdin and stdout,
    /// closes every other pipeline descriptor and execs.
    fn exec(&self, descriptors: &[RawFd]) -> ! {
        let redirects = [(self.stdin, 0), (self.stdout, 1)];
        for &(fd, target) in &redirects {
            if let Some(fd) = fd {
                if let Err(e) = unistd::dup2(fd, target) {
                    sys::child_abort(b"dup2", e.desc(), 1);
                }
            }
        }
        sys::close_descriptors(descriptors);

        let path = match self.path {
            Some(ref path) => path,
            None => sys::child_abort(self.program.as_bytes(), "command not found", 127),
        };
        match unistd::execve(path, &self.argv, &self.envp) {
            Ok(never) => match never {},
            Err(e) => sys::child_abort(self.program.as_bytes(), e.desc(), 126),
        }
    }
}

/// Spawns pipelines and tracks the processes running in the background.
#[derive(Debug, Default)]
pub struct JobTable {
    background: Vec<Job>,
    next_id: usize,
}

impl JobTable {
    pub fn new() -> Self {
        JobTable::default()
    }

    pub fn background(&self) -> &[Job] {
        &self.background
    }

    /// Forks one process per external stage, in order, and returns the
    /// foreground ones. The pipeline is consumed; dropping it closes the
    /// shell's copies of every descriptor once all children hold theirs.
    pub fn launch(&mut self, pipeline: Pipeline) -> Result<Vec<Job>, Error> {
        let descriptors = pipeline.descriptors();
        let images = pipeline
            .stages()
            .iter()
            .filter(|stage| stage.is_spawned())
            .map(|stage| ProcessImage::prepare(stage).map(|image| (stage, image)))
            .collect::<Result<Vec<_>, Error>>()?;

        let _ = io::stdout().flush();
        let mut foreground = Vec::new();
        for (stage, image) in &images {
            match unsafe { unistd::fork() }.map_err(Error::Fork)? {
                ForkResult::Parent { child } => {
                    let mode = if stage.background { Mode::Background } else { Mode::Foreground };
                    let job = self.track(child, &stage.program, mode);
                    debug!("spawned {} as pid {} ({:?})", job.program, child, mode);
                    if mode == Mode::Foreground {
                        foreground.push(job);
                    }
                }
                ForkResult::Child => image.exec(&descriptors),
            }
        }
        Ok(foreground)
    }

    fn track(&mut self, pid: Pid, program: &OsStr, mode: Mode) -> Job {
        let id = match mode {
            Mode::Background => {
                self.next_id += 1;
                self.next_id
            }
            Mode::Foreground => 0,
        };
        let job = Job {
            id,
            pid,
            program: program.to_string_lossy().into_owned(),
        };
        if mode == Mode::Background {
            self.background.push(job.clone());
        }
        job
    }

    /// Polls every background job without blocking and stops tracking the
    /// ones that have finished.
    pub fn reap(&mut self) -> Vec<Completion> {
        let mut finished = Vec::new();
        self.background.retain(|job| match poll(job) {
            Some(status) => {
                debug!("background job {} (pid {}) finished: {:?}", job.id, job.pid, status);
                finished.push(Completion {
                    job: job.clone(),
                    status,
                });
                false
            }
            None => true,
        });
        finished
    }
}

fn poll(job: &Job) -> Option<Status> {
    match wait::waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(_, code)) => Some(Status::Exited(code)),
        Ok(WaitStatus::Signaled(_, signal, _)) => Some(Status::Killed(signal)),
        Ok(_) => None,
        Err(Errno::ECHILD) => {
            warn!("lost track of background job {} (pid {})", job.id, job.pid);
            Some(Status::Lost)
        }
        Err(e) => {
            warn!("failed to poll pid {}: {}", job.pid, e);
            None
        }
    }
}

/// Blocks on each foreground job in spawn order.
pub fn wait_foreground(jobs: &[Job]) -> Result<Vec<Status>, Error> {
    jobs.iter().map(wait_for).collect()
}

fn wait_for(job: &Job) -> Result<Status, Error> {
    loop {
        match wait::waitpid(job.pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                if code != 0 {
                    info!("{} (pid {}) exited with status {}", job.program, job.pid, code);
                }
                return Ok(Status::Exited(code));
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                eprintln!("plumb: {} terminated by {}", job.program, signal);
                return Ok(Status::Killed(signal));
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(Error::Wait(e)),
        }
    }
}

pub mod config;
pub mod error;
pub mod readline;
mod state;
mod syntax;
use self::config::Config;
use self::error::Error;
use self::readline::{Delegate, LineReader};
use self::state::ShellState;
use std::os::unix::ffi::OsStrExt;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;

pub struct Shell<R: LineReader> {
    state: ShellState,
    reader: R,
    color: bool,
}

impl<R: LineReader> Shell<R> {
    pub fn new(config: Config, reader: R, color: bool) -> Self {
        Shell {
            state: ShellState::new(config),
            reader,
            color,
        }
    }

    /// Reads and runs lines until `q`, `quit`, end of input or a fatal
    /// error. Returns the process exit status.
    pub fn run_interactive(&mut self) -> i32 {
        loop {
            let prompt = self.state.prompt(self.color);
            let line = match self.reader.read_line(&prompt) {
                Ok(Some(line)) => line,
                Ok(None) => return EXIT_SUCCESS,
                Err(e) => {
                    let error = Error::Input(e);
                    error!("{}", error);
                    eprintln!("plumb: {}", error);
                    return EXIT_FAILURE;
                }
            };

            self.state.report_finished_jobs();

            match line.as_bytes() {
                b"q" | b"quit" => return EXIT_SUCCESS,
                b"" => continue,
                _ => {}
            }

            if let Err(error) = self.state.execute(&line) {
                eprintln!("plumb: {}", error);
                if self.state.is_fatal(&error) {
                    error!("fatal: {}", error);
                    return EXIT_FAILURE;
                }
            }
        }
    }
}

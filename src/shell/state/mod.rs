use super::config::Config;
use super::error::Error;
use super::readline;
use super::syntax::lexer;
use super::syntax::parser::PipelineBuilder;
use std::env;
use std::ffi::OsStr;
use termion::color;
pub mod builtins;
pub mod environment;
pub mod jobs;
use self::builtins::Builtins;
use self::environment::Environment;
use self::jobs::JobTable;

pub struct ShellState {
    pub config: Config,
    vars: Environment,
    builtins: Builtins,
    jobs: JobTable,
}

impl ShellState {
    pub fn new(config: Config) -> Self {
        ShellState::with_environment(config, Environment::from_process())
    }

    pub fn with_environment(config: Config, vars: Environment) -> Self {
        ShellState {
            builtins: Builtins::new(config.home.clone()),
            config,
            vars,
            jobs: JobTable::new(),
        }
    }

    pub fn vars(&self) -> &Environment {
        &self.vars
    }

    pub fn jobs(&self) -> &JobTable {
        &self.jobs
    }

    /// Runs one input line to completion: tokenize, build, spawn, then wait
    /// for the foreground stages.
    pub fn execute<L: AsRef<OsStr> + ?Sized>(&mut self, line: &L) -> Result<(), Error> {
        let tokens = lexer::tokenize(line);
        if tokens.is_empty() {
            return Ok(());
        }
        let pipeline = PipelineBuilder::new(&mut self.vars, &mut self.builtins).build(&tokens)?;
        let foreground = self.jobs.launch(pipeline)?;
        jobs::wait_foreground(&foreground)?;
        Ok(())
    }

    /// Prints a line for every background job that has finished since the
    /// last call.
    pub fn report_finished_jobs(&mut self) {
        for completion in self.jobs.reap() {
            println!("{}", completion.report());
        }
    }

    pub fn is_fatal(&self, error: &Error) -> bool {
        if error.is_syntax() {
            self.config.fatal_syntax_errors
        } else {
            error.is_fatal()
        }
    }
}

impl readline::Delegate for ShellState {
    fn prompt(&self, color: bool) -> String {
        let cwd = match env::current_dir() {
            Ok(x) => x.display().to_string(),
            Err(e) => format!("(error: {})", e),
        };
        let username = users::get_current_username()
            .and_then(|name| name.into_string().ok())
            .unwrap_or_else(|| String::from("(none)"));
        let last_character = if users::get_current_uid() == 0 { "#" } else { "$" };
        if color {
            format!(
                "{red}{username}{reset}@{green}{cwd}{reset}{last_character} ",
                red = color::Fg(color::Red),
                green = color::Fg(color::Green),
                reset = color::Fg(color::Reset),
                username = username,
                cwd = cwd,
                last_character = last_character
            )
        } else {
            format!("{}@{}{} ", username, cwd, last_character)
        }
    }
}

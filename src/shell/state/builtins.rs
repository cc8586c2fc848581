use super::super::error::Error;
use super::super::syntax::ast::StageKind;
use super::environment::Environment;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Commands the shell runs itself while a pipeline is being built.
pub trait BuiltinHandler {
    /// `None` for anything that should be spawned.
    fn builtin_kind(&self, name: &OsStr) -> Option<StageKind>;
    fn handle_builtin(
        &mut self,
        name: &OsStr,
        args: &[OsString],
        vars: &mut Environment,
    ) -> Result<(), Error>;
}

/// `cd` and `unset`.
pub struct Builtins {
    home: PathBuf,
}

impl Builtins {
    pub fn new(home: PathBuf) -> Self {
        Builtins { home }
    }

    fn change_directory(&self, args: &[OsString], vars: &mut Environment) -> Result<(), Error> {
        let target = args
            .first()
            .map(PathBuf::from)
            .unwrap_or_else(|| self.home.clone());
        if let Err(source) = env::set_current_dir(&target) {
            return Err(Error::ChangeDirectory { path: target, source });
        }
        debug!("cd {}", target.display());
        if let Ok(cwd) = env::current_dir() {
            vars.set("PWD", cwd)?;
        }
        Ok(())
    }

    fn unset(args: &[OsString], vars: &mut Environment) -> Result<(), Error> {
        if args.is_empty() {
            return Err(Error::UnsetUsage);
        }
        args.iter().try_for_each(|name| vars.unset(name))
    }
}

impl BuiltinHandler for Builtins {
    fn builtin_kind(&self, name: &OsStr) -> Option<StageKind> {
        match name.to_str()? {
            "cd" => Some(StageKind::Builtin),
            "unset" => Some(StageKind::Environment),
            _ => None,
        }
    }

    fn handle_builtin(
        &mut self,
        name: &OsStr,
        args: &[OsString],
        vars: &mut Environment,
    ) -> Result<(), Error> {
        match name.to_str() {
            Some("cd") => self.change_directory(args, vars),
            Some("unset") => Builtins::unset(args, vars),
            _ => {
                warn!("{} is not a builtin", name.to_string_lossy());
                Ok(())
            }
        }
    }
}

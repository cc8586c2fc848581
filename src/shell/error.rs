use super::syntax::tokens::Token;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error: a command cannot start with `{0}`")]
    LeadingSymbol(Token),
    #[error("syntax error: empty command in pipeline")]
    EmptyCommand,
    #[error("syntax error: expected a word after `{0}`")]
    MissingOperand(Token),
    #[error("{}: {source}", path.display())]
    Redirect { path: PathBuf, source: nix::Error },
    #[error("{0}: variable is not set")]
    UnsetVariable(String),
    #[error("`{0}` is not a valid variable name or value")]
    InvalidVariable(String),
    #[error("cd: {}: {source}", path.display())]
    ChangeDirectory { path: PathBuf, source: io::Error },
    #[error("unset: expected a variable name")]
    UnsetUsage,
    #[error("{0}: argument contains a NUL byte")]
    StringEncoding(String),
    #[error("pipe: {0}")]
    Pipe(nix::Error),
    #[error("fork: {0}")]
    Fork(nix::Error),
    #[error("wait: {0}")]
    Wait(nix::Error),
    #[error("input error: {0}")]
    Input(io::Error),
}

impl Error {
    /// Malformed pipelines. Whether these end the session is a
    /// configuration choice.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::LeadingSymbol(_) | Error::EmptyCommand)
    }

    /// Errors after which the shell cannot keep running.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Pipe(_) | Error::Fork(_) | Error::Wait(_) | Error::Input(_)
        )
    }
}

use std::ffi::{OsStr, OsString};
use std::fmt;

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Token {
    Background,
    Input,
    Output,
    Pipe,
    Assign,
    Substitute,
    Word(OsString),
}

impl Token {
    pub fn as_os_str(&self) -> &OsStr {
        match self {
            Token::Background => OsStr::new("&"),
            Token::Input => OsStr::new("<"),
            Token::Output => OsStr::new(">"),
            Token::Pipe => OsStr::new("|"),
            Token::Assign => OsStr::new("="),
            Token::Substitute => OsStr::new("$"),
            Token::Word(w) => w,
        }
    }

    /// Operators that may never begin a command.
    pub fn is_leading_operator(&self) -> bool {
        matches!(
            self,
            Token::Background | Token::Input | Token::Output | Token::Pipe
        )
    }

    pub fn word(&self) -> Option<&OsStr> {
        match self {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }
}

impl From<OsString> for Token {
    fn from(s: OsString) -> Token {
        match s.to_str() {
            Some("&") => Token::Background,
            Some("<") => Token::Input,
            Some(">") => Token::Output,
            Some("|") => Token::Pipe,
            Some("=") => Token::Assign,
            Some("$") => Token::Substitute,
            _ => Token::Word(s),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_os_str().to_string_lossy())
    }
}

use log::LevelFilter;
use std::env;
use std::path::PathBuf;
use users::os::unix::UserExt;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where `cd` with no argument goes.
    pub home: PathBuf,
    /// Whether a malformed pipeline ends the session.
    pub fatal_syntax_errors: bool,
    pub log_level: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            home: PathBuf::from("/"),
            fatal_syntax_errors: true,
            log_level: LevelFilter::Warn,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let home = lookup("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(user_home)
            .unwrap_or(defaults.home);
        let log_level = lookup("PLUMB_LOG")
            .and_then(|level| level.parse().ok())
            .unwrap_or(defaults.log_level);
        let fatal_syntax_errors = match lookup("PLUMB_LENIENT_SYNTAX").as_deref() {
            Some("1") | Some("true") | Some("yes") => false,
            _ => defaults.fatal_syntax_errors,
        };
        Config {
            home,
            fatal_syntax_errors,
            log_level,
        }
    }
}

fn user_home() -> Option<PathBuf> {
    users::get_user_by_uid(users::get_current_uid()).map(|user| user.home_dir().to_path_buf())
}

use super::super::error::Error;
use std::collections::BTreeMap;
use std::env;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

/// The shell's variable table. Spawned commands get a copy of it taken when
/// their stage was built; the process-wide environment is never touched.
/// Names and values are byte strings and need not be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Seeds the table from the process environment.
    pub fn from_process() -> Self {
        Environment {
            vars: env::vars_os().collect(),
        }
    }

    pub fn get<K: AsRef<OsStr>>(&self, name: K) -> Option<&OsStr> {
        self.vars.get(name.as_ref()).map(OsString::as_os_str)
    }

    pub fn set<K: AsRef<OsStr>, V: AsRef<OsStr>>(&mut self, name: K, value: V) -> Result<(), Error> {
        let (name, value) = (name.as_ref(), value.as_ref());
        if !valid_name(name) || value.as_bytes().contains(&0) {
            return Err(Error::InvalidVariable(name.to_string_lossy().into_owned()));
        }
        debug!("set {}={}", name.to_string_lossy(), value.to_string_lossy());
        self.vars.insert(name.to_owned(), value.to_owned());
        Ok(())
    }

    /// Removes `name`. Removing a variable that is not set succeeds.
    pub fn unset<K: AsRef<OsStr>>(&mut self, name: K) -> Result<(), Error> {
        let name = name.as_ref();
        if !valid_name(name) {
            return Err(Error::InvalidVariable(name.to_string_lossy().into_owned()));
        }
        if self.vars.remove(name).is_some() {
            debug!("unset {}", name.to_string_lossy());
        }
        Ok(())
    }

    /// `NAME=value` strings for `execve`.
    pub fn to_cstrings(&self) -> Result<Vec<CString>, Error> {
        self.vars
            .iter()
            .map(|(k, v)| {
                let mut entry = Vec::with_capacity(k.len() + v.len() + 1);
                entry.extend_from_slice(k.as_bytes());
                entry.push(b'=');
                entry.extend_from_slice(v.as_bytes());
                CString::new(entry)
                    .map_err(|_| Error::StringEncoding(k.to_string_lossy().into_owned()))
            })
            .collect()
    }
}

fn valid_name(name: &OsStr) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty() && !bytes.contains(&b'=') && !bytes.contains(&0)
}

//! Low-level helpers shared by the job runner. Everything called between
//! `fork` and `exec` lives here and avoids allocating.

use nix::libc;
use nix::unistd;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// Looks `program` up in the `:`-separated `search_path`. Names containing a
/// slash are taken as they are.
pub fn resolve_executable(program: &OsStr, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if program.as_bytes().contains(&b'/') {
        return Some(PathBuf::from(program));
    }
    let search_path = search_path?;
    env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Closes inherited pipeline descriptors in a child. The standard streams are
/// left alone.
pub fn close_descriptors(fds: &[RawFd]) {
    for &fd in fds {
        if fd > libc::STDERR_FILENO {
            let _ = unistd::close(fd);
        }
    }
}

/// Reports `context: reason` on stderr and leaves the child without running
/// any exit handlers.
pub fn child_abort(context: &[u8], reason: &str, status: i32) -> ! {
    for part in &[b"plumb: " as &[u8], context, b": ", reason.as_bytes(), b"\n"] {
        write_stderr(part);
    }
    unsafe { libc::_exit(status) }
}

fn write_stderr(buf: &[u8]) {
    let mut written = 0;
    while written < buf.len() {
        let n = unsafe {
            libc::write(
                libc::STDERR_FILENO,
                buf[written..].as_ptr() as *const libc::c_void,
                buf.len() - written,
            )
        };
        if n <= 0 {
            return;
        }
        written += n as usize;
    }
}

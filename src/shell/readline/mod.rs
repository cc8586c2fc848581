use std::ffi::OsString;
use std::io::{self, BufRead, Stdin, Stdout, Write};
use std::os::unix::ffi::OsStringExt;

/// Source of input lines. `Ok(None)` means end of input. Lines are raw
/// bytes; nothing requires them to be UTF-8.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<OsString>>;
}

/// Prompt contents are supplied by whoever owns the shell state.
pub trait Delegate {
    fn prompt(&self, color: bool) -> String;
}

pub struct Readline<R, W> {
    input: R,
    output: W,
    interactive: bool,
}

impl Readline<io::StdinLock<'static>, Stdout> {
    /// Reads from stdin, showing a prompt only when it is a terminal.
    pub fn stdin() -> Self {
        let stdin: Stdin = io::stdin();
        let interactive = termion::is_tty(&stdin);
        Readline::new(stdin.lock(), io::stdout(), interactive)
    }
}

impl<R: BufRead, W: Write> Readline<R, W> {
    pub fn new(input: R, output: W, interactive: bool) -> Self {
        Readline {
            input,
            output,
            interactive,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }
}

impl<R: BufRead, W: Write> LineReader for Readline<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<OsString>> {
        if self.interactive {
            self.output.write_all(prompt.as_bytes())?;
            self.output.flush()?;
        }
        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        while let Some(b'\n') | Some(b'\r') = line.last() {
            line.pop();
        }
        Ok(Some(OsString::from_vec(line)))
    }
}

use super::super::error::Error;
use super::super::state::builtins::BuiltinHandler;
use super::super::state::environment::Environment;
use super::ast::{Pipeline, Stage, StageKind};
use super::tokens::Token;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd;
use std::ffi::OsStr;
use std::os::unix::io::{FromRawFd, OwnedFd};
use std::path::Path;

/// Turns a token sequence into a pipeline of stages. Building is not pure:
/// redirection targets are opened, variables are set and unset, and builtins
/// run as their stage is reached, so later stages of the same line observe
/// the effects of earlier ones.
pub struct PipelineBuilder<'a, B: BuiltinHandler> {
    vars: &'a mut Environment,
    builtins: &'a mut B,
}

impl<'a, B: BuiltinHandler> PipelineBuilder<'a, B> {
    pub fn new(vars: &'a mut Environment, builtins: &'a mut B) -> Self {
        PipelineBuilder { vars, builtins }
    }

    /// On error every descriptor opened so far is closed when the partial
    /// stages are dropped.
    pub fn build(&mut self, tokens: &[Token]) -> Result<Pipeline, Error> {
        let mut stages = Vec::new();
        for segment in tokens.split(|t| *t == Token::Pipe) {
            stages.push(self.build_stage(segment)?);
        }
        connect(&mut stages)?;
        Ok(Pipeline::new(stages))
    }

    fn build_stage(&mut self, tokens: &[Token]) -> Result<Stage, Error> {
        let first = match tokens.first() {
            Some(t) if t.is_leading_operator() => return Err(Error::LeadingSymbol(t.clone())),
            Some(t) => t,
            None => return Err(Error::EmptyCommand),
        };
        let mut stage = Stage::new(first.as_os_str());

        let mut i = 1;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Output => {
                    let path = operand(tokens, i)?;
                    let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND;
                    stage.stdout = Some(open_redirect(path, flags)?);
                    i += 1;
                }
                Token::Input => {
                    let path = operand(tokens, i)?;
                    stage.stdin = Some(open_redirect(path, OFlag::O_RDONLY)?);
                    i += 1;
                }
                Token::Background => stage.background = true,
                Token::Assign => {
                    let name = tokens[i - 1]
                        .word()
                        .ok_or_else(|| Error::MissingOperand(Token::Assign))?;
                    let value = operand(tokens, i)?;
                    self.vars.set(name, value)?;
                    stage.kind = StageKind::Environment;
                    i += 1;
                }
                Token::Substitute => {
                    let name = operand(tokens, i)?;
                    let value = self
                        .vars
                        .get(name)
                        .ok_or_else(|| Error::UnsetVariable(name.to_string_lossy().into_owned()))?;
                    stage.args.push(value.to_owned());
                    i += 1;
                }
                other => stage.args.push(other.as_os_str().to_owned()),
            }
            i += 1;
        }

        if stage.kind == StageKind::External {
            if let Some(kind) = self.builtins.builtin_kind(&stage.program) {
                stage.kind = kind;
                self.builtins
                    .handle_builtin(&stage.program, &stage.args[1..], self.vars)?;
            }
        }
        stage.env = self.vars.clone();
        Ok(stage)
    }
}

/// The word following the operator at `i`.
fn operand(tokens: &[Token], i: usize) -> Result<&OsStr, Error> {
    tokens
        .get(i + 1)
        .and_then(Token::word)
        .ok_or_else(|| Error::MissingOperand(tokens[i].clone()))
}

fn open_redirect(path: &OsStr, flags: OFlag) -> Result<OwnedFd, Error> {
    let path = Path::new(path);
    let mode = Mode::from_bits_truncate(0o666);
    match fcntl::open(path, flags | OFlag::O_CLOEXEC, mode) {
        Ok(fd) => {
            trace!("opened {} as fd {}", path.display(), fd);
            Ok(unsafe { OwnedFd::from_raw_fd(fd) })
        }
        Err(source) => Err(Error::Redirect { path: path.into(), source }),
    }
}

/// Joins each adjacent pair of stages with a fresh pipe. A pipe end replaces
/// whatever redirection the stage had on that side, and the replaced
/// descriptor is closed.
fn connect(stages: &mut [Stage]) -> Result<(), Error> {
    for i in 1..stages.len() {
        let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(Error::Pipe)?;
        stages[i - 1].stdout = Some(write);
        stages[i].stdin = Some(read);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;
    use std::ffi::OsString;
    use std::fs::{self, File};
    use std::io::{Read, Write};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(OsString, Vec<OsString>)>,
    }

    impl BuiltinHandler for Recorder {
        fn builtin_kind(&self, name: &OsStr) -> Option<StageKind> {
            match name.to_str() {
                Some("cd") => Some(StageKind::Builtin),
                _ => None,
            }
        }

        fn handle_builtin(
            &mut self,
            name: &OsStr,
            args: &[OsString],
            _: &mut Environment,
        ) -> Result<(), Error> {
            self.calls.push((name.to_owned(), args.to_vec()));
            Ok(())
        }
    }

    fn build(line: &str, vars: &mut Environment) -> Result<Pipeline, Error> {
        let mut builtins = Recorder::default();
        PipelineBuilder::new(vars, &mut builtins).build(&tokenize(line))
    }

    #[test]
    fn one_stage_per_pipe() {
        let mut vars = Environment::new();
        let pipeline = build("ls -l | grep foo | wc", &mut vars).unwrap();
        assert_eq!(pipeline.stages().len(), 3);
        assert_eq!(pipeline.stages()[0].args, vec!["ls", "-l"]);
        assert_eq!(pipeline.stages()[1].program, "grep");
        assert_eq!(pipeline.stages()[1].args, vec!["grep", "foo"]);
        assert_eq!(pipeline.stages()[2].args, vec!["wc"]);
    }

    #[test]
    fn single_stage_inherits_stdio() {
        let mut vars = Environment::new();
        let pipeline = build("echo hi", &mut vars).unwrap();
        let stage = &pipeline.stages()[0];
        assert!(stage.stdin.is_none());
        assert!(stage.stdout.is_none());
        assert!(pipeline.descriptors().is_empty());
    }

    #[test]
    fn adjacent_stages_share_a_pipe() {
        let mut vars = Environment::new();
        let mut pipeline = build("echo hi | cat", &mut vars).unwrap();
        assert!(pipeline.stages()[0].stdin.is_none());
        assert!(pipeline.stages()[1].stdout.is_none());

        let write_end = pipeline.stages_mut()[0].stdout.take().unwrap();
        let read_end = pipeline.stages_mut()[1].stdin.take().unwrap();
        let mut writer = File::from(write_end);
        writer.write_all(b"through the pipe").unwrap();
        drop(writer);

        let mut received = String::new();
        File::from(read_end).read_to_string(&mut received).unwrap();
        assert_eq!(received, "through the pipe");
    }

    #[test]
    fn close_list_covers_every_stage() {
        let mut vars = Environment::new();
        let pipeline = build("a | b | c", &mut vars).unwrap();
        let fds = pipeline.descriptors();
        assert_eq!(fds.len(), 4);
        for stage in pipeline.stages() {
            for fd in stage.descriptors() {
                assert!(fds.contains(&fd));
            }
        }
    }

    #[test]
    fn leading_operator_is_rejected() {
        let mut vars = Environment::new();
        for line in &["| ls", "< in cat", "> out", "& ls", "ls | > x"] {
            match build(line, &mut vars) {
                Err(e) => assert!(e.is_syntax(), "{}: {:?}", line, e),
                Ok(_) => panic!("{} should not build", line),
            }
        }
        assert!(matches!(build("ls |", &mut vars), Err(Error::EmptyCommand)));
    }

    #[test]
    fn redirections_consume_their_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::write(&input, "data").unwrap();
        let output = dir.path().join("out");
        let line = format!("sort -r < {} > {} -u", input.display(), output.display());

        let mut vars = Environment::new();
        let pipeline = build(&line, &mut vars).unwrap();
        let stage = &pipeline.stages()[0];
        assert_eq!(stage.args, vec!["sort", "-r", "-u"]);
        assert!(stage.stdin.is_some());
        assert!(stage.stdout.is_some());
        assert!(output.exists());
    }

    #[test]
    fn output_redirect_appends() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("log");
        fs::write(&output, "first\n").unwrap();

        let mut vars = Environment::new();
        let mut pipeline = build(&format!("cmd > {}", output.display()), &mut vars).unwrap();
        let fd = pipeline.stages_mut()[0].stdout.take().unwrap();
        File::from(fd).write_all(b"second\n").unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn pipe_overrides_redirection() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("unused");
        let mut vars = Environment::new();
        let pipeline = build(&format!("echo a > {} | cat", output.display()), &mut vars).unwrap();
        assert_eq!(pipeline.descriptors().len(), 2);
    }

    #[test]
    fn unopenable_redirect_fails() {
        let mut vars = Environment::new();
        let result = build("echo hi > /nonexistent-dir/plumb/out", &mut vars);
        assert!(matches!(result, Err(Error::Redirect { .. })));
        let result = build("cat < /nonexistent-dir/plumb/in", &mut vars);
        assert!(matches!(result, Err(Error::Redirect { .. })));
    }

    #[test]
    fn operators_need_operands() {
        let mut vars = Environment::new();
        assert!(matches!(build("echo >", &mut vars), Err(Error::MissingOperand(Token::Output))));
        assert!(matches!(build("echo $", &mut vars), Err(Error::MissingOperand(Token::Substitute))));
        assert!(matches!(build("A=", &mut vars), Err(Error::MissingOperand(Token::Assign))));
    }

    #[test]
    fn assignment_is_an_environment_stage() {
        let mut vars = Environment::new();
        let pipeline = build("GREETING=hello", &mut vars).unwrap();
        assert_eq!(pipeline.stages()[0].kind, StageKind::Environment);
        assert!(!pipeline.stages()[0].is_spawned());
        assert_eq!(vars.get("GREETING"), Some(OsStr::new("hello")));
    }

    #[test]
    fn substitution_uses_value_at_build_time() {
        let mut vars = Environment::new();
        build("GREETING=hello", &mut vars).unwrap();
        let pipeline = build("echo $GREETING world", &mut vars).unwrap();
        assert_eq!(pipeline.stages()[0].args, vec!["echo", "hello", "world"]);

        let pipeline = build("NAME=x | echo $NAME", &mut vars).unwrap();
        assert_eq!(pipeline.stages()[1].args, vec!["echo", "x"]);
        assert_eq!(pipeline.stages()[1].env.get("NAME"), Some(OsStr::new("x")));
    }

    #[test]
    fn substituting_unset_variable_fails() {
        let mut vars = Environment::new();
        assert!(matches!(
            build("echo $MISSING", &mut vars),
            Err(Error::UnsetVariable(ref name)) if name == "MISSING"
        ));
    }

    #[test]
    fn background_flag_is_per_stage() {
        let mut vars = Environment::new();
        let pipeline = build("sleep 1 & | cat", &mut vars).unwrap();
        assert!(pipeline.stages()[0].background);
        assert!(!pipeline.stages()[1].background);
        assert_eq!(pipeline.stages()[0].args, vec!["sleep", "1"]);
    }

    #[test]
    fn builtins_run_during_build() {
        let mut vars = Environment::new();
        let mut builtins = Recorder::default();
        let pipeline = PipelineBuilder::new(&mut vars, &mut builtins)
            .build(&tokenize("cd /tmp"))
            .unwrap();
        assert_eq!(pipeline.stages()[0].kind, StageKind::Builtin);
        assert_eq!(builtins.calls, vec![(OsString::from("cd"), vec![OsString::from("/tmp")])]);
    }

    #[test]
    fn stage_snapshot_is_independent() {
        let mut vars = Environment::new();
        vars.set("PATH", "/bin").unwrap();
        let pipeline = build("ls", &mut vars).unwrap();
        vars.set("PATH", "/elsewhere").unwrap();
        assert_eq!(pipeline.stages()[0].env.get("PATH"), Some(OsStr::new("/bin")));
    }

    #[test]
    fn non_utf8_words_reach_arguments_and_variables() {
        use std::os::unix::ffi::OsStringExt;
        let mut vars = Environment::new();
        let value = OsString::from_vec(b"caf\xe9".to_vec());
        let line = OsString::from_vec(b"WORD=caf\xe9".to_vec());
        let mut builtins = Recorder::default();
        PipelineBuilder::new(&mut vars, &mut builtins)
            .build(&tokenize(&line))
            .unwrap();
        assert_eq!(vars.get("WORD"), Some(value.as_os_str()));

        let pipeline = build("echo $WORD", &mut vars).unwrap();
        assert_eq!(pipeline.stages()[0].args, vec![OsString::from("echo"), value]);
    }
}

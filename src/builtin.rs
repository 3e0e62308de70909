use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process, without going through the redirection engine.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Names the command answers to, e.g. `["cd"]`.
    fn names() -> &'static [&'static str];

    /// Executes the command, writing any output to `stdout`.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        match T::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stdout, "tsh: {e:#}")?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        stdout.write_all(self.output.as_bytes())?;
        Ok(if self.is_error { 1 } else { 0 })
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if T::names().contains(&name) {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn names() -> &'static [&'static str] {
        &["cd"]
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.targets.as_slice() {
            [] => match &env.home {
                Some(home) => home.clone(),
                None => return Err(anyhow::anyhow!("cd: no target and HOME not set")),
            },
            [target] => PathBuf::from(target),
            _ => {
                writeln!(stdout, "tsh: Too many arguments.")?;
                return Ok(1);
            }
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        log::debug!("changed directory to {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Leave the shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored
    pub args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn names() -> &'static [&'static str] {
        &["exit", "quit", "logout"]
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Clear the terminal and move the cursor to the top-left corner.
pub struct Clear {}

impl BuiltinCommand for Clear {
    fn names() -> &'static [&'static str] {
        &["clear"]
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        write!(stdout, "\x1b[2J\x1b[1;1H")?;
        stdout.flush()?;
        Ok(0)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env as stdenv;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serializes tests that change the process working directory.
    pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn test_env() -> Environment {
        Environment {
            home: None,
            current_dir: stdenv::current_dir().unwrap(),
            should_exit: false,
        }
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(temp.path()).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();
        let mut env = test_env();

        let cmd = Cd {
            targets: vec![canonical_temp.to_string_lossy().to_string()],
        };
        let res = BuiltinCommand::execute(cmd, &mut Vec::new(), &mut env);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), canonical_temp);
        assert_eq!(env.current_dir, canonical_temp);

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let canonical_temp = fs::canonicalize(temp.path()).expect("canonicalize failed");
        let orig = stdenv::current_dir().unwrap();
        let mut env = test_env();
        env.home = Some(canonical_temp.clone());

        let cmd = Cd { targets: vec![] };
        let res = BuiltinCommand::execute(cmd, &mut Vec::new(), &mut env);

        assert_eq!(res.unwrap(), 0);
        assert_eq!(env.current_dir, canonical_temp);

        stdenv::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn test_cd_with_two_arguments_is_usage_error() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = test_env();
        let mut out = Vec::new();

        let cmd = Cd {
            targets: vec!["/".to_string(), "/tmp".to_string()],
        };
        let res = BuiltinCommand::execute(cmd, &mut out, &mut env);

        assert_eq!(res.unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "tsh: Too many arguments.\n");
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_without_home_errors() {
        let _lock = lock_current_dir();
        let mut env = test_env();
        let res = BuiltinCommand::execute(Cd { targets: vec![] }, &mut Vec::new(), &mut env);
        assert!(res.is_err());
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = test_env();

        let name = format!("nonexistent_dir_for_tsh_test_{}", std::process::id());
        let cmd = Cd { targets: vec![name] };
        let res = BuiltinCommand::execute(cmd, &mut Vec::new(), &mut env);

        assert!(res.is_err());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_failure_through_factory_prints_error() {
        let _lock = lock_current_dir();
        let mut env = test_env();
        let mut out = Vec::new();

        let cmd = Factory::<Cd>::default()
            .try_create(&env, "cd", &["/definitely/not/here"])
            .expect("cd is a builtin");
        let code = cmd.execute(&mut out, &mut env).unwrap();

        assert_eq!(code, 1);
        assert!(String::from_utf8(out).unwrap().starts_with("tsh: cd: can't canonicalize"));
    }

    #[test]
    fn test_exit_aliases_set_flag() {
        for name in ["exit", "quit", "logout"] {
            let mut env = test_env();
            let cmd = Factory::<Exit>::default()
                .try_create(&env, name, &[])
                .expect("exit is a builtin");
            assert_eq!(cmd.execute(&mut Vec::new(), &mut env).unwrap(), 0);
            assert!(env.should_exit);
        }
    }

    #[test]
    fn test_clear_writes_escape_sequence() {
        let mut env = test_env();
        let mut out = Vec::new();
        let res = BuiltinCommand::execute(Clear {}, &mut out, &mut env);
        assert_eq!(res.unwrap(), 0);
        assert_eq!(out, b"\x1b[2J\x1b[1;1H");
    }

    #[test]
    fn test_factory_ignores_other_names() {
        let env = test_env();
        assert!(Factory::<Cd>::default().try_create(&env, "ls", &[]).is_none());
        assert!(Factory::<Clear>::default().try_create(&env, "cls", &[]).is_none());
    }
}

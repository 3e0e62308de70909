use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::interpreter::Factory;
use crate::redirect::{self, DispatchError};
use anyhow::Result;
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::io::Write;
use std::os::fd::BorrowedFd;

/// Exit status of a child whose program could not be executed.
pub const EXEC_FAILURE: ExitCode = 127;

/// Command that is not a builtin.
///
/// The whole argument vector, operators included, goes to the redirection
/// engine.
pub struct ExternalCommand {
    argv: Vec<String>,
}

impl ExternalCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let argv = std::iter::once(name)
            .chain(args.iter().copied())
            .map(str::to_owned)
            .collect();
        Some(Box::new(ExternalCommand::new(argv)))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        stdout.flush()?;
        Ok(redirect::dispatch(&self.argv)?)
    }
}

/// A forked child running an external program.
///
/// The child is reaped either by [`ChildProcess::wait`] or, on any other exit
/// path, when the value is dropped.
#[derive(Debug)]
pub struct ChildProcess {
    pid: Pid,
    program: String,
    reaped: bool,
}

impl ChildProcess {
    /// Fork and exec `argv[0]` with `argv` as its arguments.
    ///
    /// `stdin` and `stdout`, when given, are duplicated onto the child's
    /// standard input and output before the exec. Any other descriptor the
    /// child should not keep must be close-on-exec. If the program cannot be
    /// executed, the child reports it on standard error and exits with
    /// [`EXEC_FAILURE`]; the parent still gets a `ChildProcess` to wait on.
    pub fn spawn(
        argv: &[String],
        stdin: Option<BorrowedFd<'_>>,
        stdout: Option<BorrowedFd<'_>>,
    ) -> Result<Self, DispatchError> {
        let Some(program) = argv.first() else {
            return Err(DispatchError::EmptyCommand);
        };
        // Everything the child needs is allocated before forking.
        let args = argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let failure_prefix = format!("tsh: {program}: ");

        // SAFETY: the child only calls async-signal-safe functions before it
        // execs or exits.
        match unsafe { unistd::fork() }.map_err(DispatchError::Fork)? {
            ForkResult::Parent { child } => {
                log::debug!("spawned {program:?} as pid {child}");
                Ok(Self {
                    pid: child,
                    program: program.clone(),
                    reaped: false,
                })
            }
            ForkResult::Child => exec_child(&args, &failure_prefix, stdin, stdout),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Block until the child terminates and return its exit code.
    pub fn wait(mut self) -> Result<ExitCode, DispatchError> {
        self.reaped = true;
        loop {
            match waitpid(self.pid, None) {
                Ok(status) => {
                    if let Some(code) = exit_code(status) {
                        log::debug!("{:?} (pid {}) exited with {code}", self.program, self.pid);
                        return Ok(code);
                    }
                }
                Err(Errno::EINTR) => {}
                Err(e) => return Err(DispatchError::Wait(e)),
            }
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        log::debug!("reaping abandoned child {:?} (pid {})", self.program, self.pid);
        loop {
            match waitpid(self.pid, None) {
                Ok(status) if exit_code(status).is_some() => break,
                Ok(_) | Err(Errno::EINTR) => {}
                Err(_) => break,
            }
        }
    }
}

/// Exit code of a terminated child, or `None` for a status that does not end
/// the process.
fn exit_code(status: WaitStatus) -> Option<ExitCode> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, signal, _) => Some(128 + signal as i32),
        _ => None,
    }
}

fn exec_child(
    args: &[CString],
    failure_prefix: &str,
    stdin: Option<BorrowedFd<'_>>,
    stdout: Option<BorrowedFd<'_>>,
) -> ! {
    // The Rust runtime ignores SIGPIPE and an ignored disposition survives
    // exec, so both signals are reset.
    for sig in [Signal::SIGINT, Signal::SIGPIPE] {
        // SAFETY: restoring the default disposition installs no handler.
        let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
    }

    if let Some(fd) = stdin {
        if let Err(errno) = unistd::dup2_stdin(fd) {
            child_failure(failure_prefix, errno);
        }
    }
    if let Some(fd) = stdout {
        if let Err(errno) = unistd::dup2_stdout(fd) {
            child_failure(failure_prefix, errno);
        }
    }

    match unistd::execvp(&args[0], args) {
        Ok(never) => match never {},
        Err(errno) => child_failure(failure_prefix, errno),
    }
}

fn child_failure(prefix: &str, errno: Errno) -> ! {
    let stderr = std::io::stderr();
    let _ = unistd::write(&stderr, prefix.as_bytes());
    let _ = unistd::write(&stderr, errno.desc().as_bytes());
    let _ = unistd::write(&stderr, b"\n");
    // SAFETY: `_exit` skips atexit handlers and stdio buffers shared with the
    // parent.
    unsafe { nix::libc::_exit(EXEC_FAILURE) }
}

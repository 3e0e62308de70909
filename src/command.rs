use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal report `128 + signal`, like POSIX shells do.
pub type ExitCode = i32;

/// Object-safe trait for any command that can be dispatched by the shell.
///
/// This is implemented by built-ins via a blanket impl and by
/// [`ExternalCommand`](crate::external::ExternalCommand), which hands its
/// argument vector to the redirection engine.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// Built-ins write their output to `stdout`. External programs write to
    /// the inherited standard output descriptor instead.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}

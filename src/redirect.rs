//! Redirection and two-stage pipelines over a flat argument vector.
//!
//! An argument vector is scanned for one operator token, in priority order
//! `|`, `<`, `>`. The first operator found splits the vector into the program
//! before it and the operand after it. Operators never chain: only one of
//! them is honoured per command, and any later operator token is passed on as
//! an ordinary argument.

use crate::command::ExitCode;
use crate::external::ChildProcess;
use std::ffi::NulError;
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::path::PathBuf;
use thiserror::Error;

/// Size of the buffer used to forward redirected output into its file.
const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `|`
    Pipe,
    /// `<`
    Input,
    /// `>`
    Output,
}

impl Operator {
    /// Operators in the order the dispatcher checks them.
    pub const PRIORITY: [Operator; 3] = [Operator::Pipe, Operator::Input, Operator::Output];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Pipe => "|",
            Operator::Input => "<",
            Operator::Output => ">",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An operator found in an argument vector, with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectionSymbol {
    pub operator: Operator,
    pub index: usize,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no command to run")]
    EmptyCommand,
    #[error("missing operand after `{0}`")]
    MissingOperand(Operator),
    #[error("arguments may not contain NUL bytes")]
    Nul(#[from] NulError),
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("cannot fork: {0}")]
    Fork(#[source] nix::Error),
    #[error("cannot wait for child: {0}")]
    Wait(#[source] nix::Error),
    #[error("cannot forward output: {0}")]
    Forward(#[source] io::Error),
}

/// Find the first `operator` token in `argv`, never looking at the program
/// name in position 0.
pub fn find_symbol(argv: &[String], operator: Operator) -> Option<RedirectionSymbol> {
    argv.iter()
        .enumerate()
        .skip(1)
        .find(|(_, arg)| arg.as_str() == operator.symbol())
        .map(|(index, _)| RedirectionSymbol { operator, index })
}

/// Split `argv` around the operator at `symbol.index` into the command before
/// it and the operand after it.
pub fn partition(
    argv: &[String],
    symbol: RedirectionSymbol,
) -> Result<(Vec<String>, Vec<String>), DispatchError> {
    let before = argv[..symbol.index].to_vec();
    let after = argv[symbol.index + 1..].to_vec();
    if before.is_empty() {
        return Err(DispatchError::EmptyCommand);
    }
    if after.is_empty() {
        return Err(DispatchError::MissingOperand(symbol.operator));
    }
    Ok((before, after))
}

/// Run `argv`, honouring the first operator it contains.
///
/// Falls back to running the whole vector as one program when there is no
/// operator.
pub fn dispatch(argv: &[String]) -> Result<ExitCode, DispatchError> {
    log::debug!("dispatching {argv:?}");
    for operator in Operator::PRIORITY {
        if let Some(code) = redirect(argv, operator)? {
            return Ok(code);
        }
    }
    execute(argv)
}

/// Run `argv` as a single program with the shell's own descriptors.
pub fn execute(argv: &[String]) -> Result<ExitCode, DispatchError> {
    ChildProcess::spawn(argv, None, None)?.wait()
}

/// Handle `operator` in `argv`. Returns `Ok(None)` without starting anything
/// when `argv` does not contain the operator.
pub fn redirect(argv: &[String], operator: Operator) -> Result<Option<ExitCode>, DispatchError> {
    match operator {
        Operator::Pipe => redirect_pipe(argv),
        Operator::Input => redirect_in(argv),
        Operator::Output => redirect_out(argv),
    }
}

/// `program args < file`: the program reads `file` on its standard input.
pub fn redirect_in(argv: &[String]) -> Result<Option<ExitCode>, DispatchError> {
    let Some(symbol) = find_symbol(argv, Operator::Input) else {
        return Ok(None);
    };
    let (before, after) = partition(argv, symbol)?;
    let path = PathBuf::from(&after[0]);
    let input = File::open(&path).map_err(|source| DispatchError::Open { path, source })?;

    let child = ChildProcess::spawn(&before, Some(input.as_fd()), None)?;
    child.wait().map(Some)
}

/// `program args > file`: the program's standard output is collected through
/// a pipe and written to `file`, which is created or truncated.
pub fn redirect_out(argv: &[String]) -> Result<Option<ExitCode>, DispatchError> {
    let Some(symbol) = find_symbol(argv, Operator::Output) else {
        return Ok(None);
    };
    let (before, after) = partition(argv, symbol)?;
    let path = PathBuf::from(&after[0]);
    let mut output = File::create(&path).map_err(|source| DispatchError::Open { path, source })?;

    let (mut reader, writer) = io::pipe().map_err(DispatchError::Pipe)?;
    let child = ChildProcess::spawn(&before, None, Some(writer.as_fd()))?;
    drop(writer);

    // The pipe is drained before waiting so a child producing more than the
    // pipe buffer holds never blocks.
    let forwarded = forward(&mut reader, &mut output);
    drop(reader);
    let code = child.wait()?;
    let bytes = forwarded.map_err(DispatchError::Forward)?;
    log::debug!("forwarded {bytes} bytes to {}", after[0]);
    Ok(Some(code))
}

/// `first args | second args`: the first program's standard output feeds the
/// second program's standard input.
pub fn redirect_pipe(argv: &[String]) -> Result<Option<ExitCode>, DispatchError> {
    let Some(symbol) = find_symbol(argv, Operator::Pipe) else {
        return Ok(None);
    };
    let (before, after) = partition(argv, symbol)?;

    let (reader, writer) = io::pipe().map_err(DispatchError::Pipe)?;
    let first = ChildProcess::spawn(&before, None, Some(writer.as_fd()))?;
    drop(writer);
    let second = ChildProcess::spawn(&after, Some(reader.as_fd()), None);
    drop(reader);
    let second = second?;

    first.wait()?;
    second.wait().map(Some)
}

/// Copy everything from `reader` into `writer` in fixed-size chunks.
fn forward(reader: &mut impl Read, writer: &mut impl Write) -> io::Result<u64> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut total = 0;
    loop {
        let count = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(count) => count,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..count])?;
        total += count as u64;
    }
    writer.flush()?;
    Ok(total)
}

//! `tsh`, an interactive command dispatcher with aliases and redirection.
//!
//! A line typed at the prompt is split on spaces, its first word is resolved
//! against a table of user-defined aliases, and the resulting argument vector
//! is either handled by a builtin (`cd`, `exit`, `clear`) or run as an
//! external program. One `<`, `>` or `|` operator per line is honoured; the
//! redirection engine wires the child's descriptors through fork, exec and
//! wait.
//!
//! The main entry point is [`Interpreter`], the session value that owns the
//! environment, the alias table and the configuration. The leaf modules
//! ([`vector`], [`hash`], [`lexer`], [`alias`], [`redirect`]) can be used on
//! their own.

pub mod alias;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod external;
pub mod hash;
mod interpreter;
pub mod lexer;
pub mod prompt;
pub mod redirect;
pub mod vector;

pub use alias::AliasTable;
pub use config::{Args, Config};
pub use hash::{DeletionMode, StringMap};
/// The interactive session.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use redirect::DispatchError;
pub use vector::Vector;

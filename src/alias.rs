//! User-defined command aliases.
//!
//! Aliases are read from a line-oriented file where each definition looks like
//! `<name> <anything>'<raw command>'`. The name runs up to the first space and
//! the raw command runs from just after the first `'` up to, but excluding,
//! the final character of the line. Lines starting with `#` and lines of at
//! most one character are ignored.
//!
//! The [`AliasTable`] keeps the definitions in a [`StringMap`] plus a parallel
//! [`Vector`] of names in file order. The name list drives both lookup and
//! teardown.

use crate::hash::{MapError, StringMap};
use crate::lexer::{self, DELIMITER};
use crate::vector::Vector;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("failed to read alias definitions")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// A single parsed line of an alias file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasLine<'a> {
    /// Comment or blank line.
    Ignored,
    Definition { name: &'a str, command: &'a str },
    /// A data line that does not follow the definition format.
    Malformed(&'static str),
}

/// Classify one line of an alias file, without its line terminator.
pub fn parse_line(line: &str) -> AliasLine<'_> {
    if line.starts_with('#') || line.len() <= 1 {
        return AliasLine::Ignored;
    }
    let Some((name, _)) = line.split_once(DELIMITER) else {
        return AliasLine::Malformed("no space after the alias name");
    };
    if name.is_empty() {
        return AliasLine::Malformed("empty alias name");
    }
    let Some(quote) = line.find('\'') else {
        return AliasLine::Malformed("no opening quote before the command");
    };
    let last_len = line.chars().last().map_or(0, char::len_utf8);
    let end = line.len() - last_len;
    match line.get(quote + 1..end) {
        Some(command) if !command.is_empty() => AliasLine::Definition { name, command },
        _ => AliasLine::Malformed("empty command"),
    }
}

/// Alias names mapped to the raw commands they stand for.
#[derive(Debug)]
pub struct AliasTable {
    commands: StringMap,
    keys: Vector,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self {
            commands: StringMap::new(0),
            keys: Vector::new(),
        }
    }
}

impl AliasTable {
    /// Load aliases from the file at `path`.
    ///
    /// A missing or unreadable file gives an empty table; the shell simply
    /// runs without aliases.
    pub fn load(path: &Path) -> Self {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("alias file {} not loaded: {}", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_reader(BufReader::new(file)) {
            Ok(table) => {
                log::info!("loaded {} aliases from {}", table.len(), path.display());
                table
            }
            Err(e) => {
                log::warn!("alias file {} not loaded: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse alias definitions from `reader`.
    ///
    /// A name defined twice keeps its first position in the key list and the
    /// value of its last definition. Lines that are not valid UTF-8 are skipped.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, AliasError> {
        let mut definitions = Vec::new();
        let mut buffer = Vec::new();
        let mut number = 0;
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer)? == 0 {
                break;
            }
            number += 1;
            let bytes = buffer.strip_suffix(b"\n").unwrap_or(&buffer[..]);
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
            let line = match std::str::from_utf8(bytes) {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("alias line {number} skipped: {e}");
                    continue;
                }
            };
            match parse_line(line) {
                AliasLine::Ignored => {}
                AliasLine::Definition { name, command } => {
                    definitions.push((name.to_owned(), command.to_owned()));
                }
                AliasLine::Malformed(reason) => {
                    log::warn!("alias line {number} skipped: {reason}: {line:?}");
                }
            }
        }

        let mut commands = StringMap::new(definitions.len());
        let mut keys = Vector::new();
        for (name, command) in definitions {
            commands.insert(&name, &command)?;
            if !keys.iter().any(|key| key == name) {
                keys.add(keys.len(), name);
            }
        }
        Ok(Self { commands, keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Alias names in definition order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter()
    }

    /// Raw command for `name`, if it is a known alias.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let key = self.keys.iter().find(|key| *key == name)?;
        self.commands.lookup(key)
    }

    /// Splice the expansion of an aliased first token into `tokens`.
    ///
    /// The words of the raw command are inserted right after the alias name,
    /// in their original order; the alias name itself stays at index 0.
    /// Returns whether an alias matched.
    pub fn expand(&self, tokens: &mut Vector) -> bool {
        if tokens.is_empty() {
            return false;
        }
        let Some(command) = self.lookup(tokens.get(0)) else {
            return false;
        };
        log::debug!("expanding alias {:?} to {:?}", tokens.get(0), command);
        let words = lexer::split_into_tokens(command, DELIMITER);
        for word in words.into_inner().into_iter().rev() {
            tokens.add(1, word);
        }
        true
    }

    /// Remove every alias from the map, in key-list order, then release the
    /// key list and the buckets.
    pub fn teardown(self) {
        drop(self);
    }

    fn release(&mut self) {
        let keys = std::mem::take(&mut self.keys);
        for key in keys {
            self.commands.remove(&key);
        }
        self.commands = StringMap::new(0);
    }
}

impl Drop for AliasTable {
    fn drop(&mut self) {
        if !self.keys.is_empty() {
            log::debug!("releasing {} aliases", self.keys.len());
        }
        self.release();
    }
}

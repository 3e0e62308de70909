use std::env as stdenv;
use std::path::PathBuf;

/// Session state shared with the builtins.
///
/// External programs inherit the real process environment and working
/// directory, so only what the builtins consult is kept here. `cd` updates
/// both `current_dir` and the process working directory.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Target of a bare `cd`, taken from `$HOME` at startup.
    pub home: Option<PathBuf>,
    pub current_dir: PathBuf,
    /// Set by `exit`, checked by the read loop.
    pub should_exit: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Capture the home and working directories of the current process.
    pub fn new() -> Self {
        Self {
            home: dirs::home_dir(),
            current_dir: stdenv::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            should_exit: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_captures_process_state() {
        let env = Environment::new();
        assert_eq!(env.current_dir, stdenv::current_dir().unwrap());
        assert_eq!(env.home, dirs::home_dir());
        assert!(!env.should_exit);
    }
}

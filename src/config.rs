use anyhow::{Context, Result};
use argh::FromArgs;
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROMPT: &str = "T-Shell: ";
pub const DEFAULT_HISTORY_SIZE: usize = 1000;

const ALIAS_FILE: &str = ".tsh-alias";
const RC_FILE: &str = ".tsh-rc";
const HISTORY_FILE: &str = ".tsh-history";

/// Alias-resolving command dispatcher with `<`, `>` and `|` redirection.
#[derive(FromArgs, Debug, Default)]
pub struct Args {
    #[argh(option, short = 'c')]
    /// dispatch a single command line and exit with its status
    pub command: Option<String>,

    #[argh(option)]
    /// alias definition file (default: ~/.tsh-alias)
    pub aliases: Option<PathBuf>,

    #[argh(option)]
    /// configuration file (default: ~/.tsh-rc)
    pub rc: Option<PathBuf>,

    #[argh(option)]
    /// history file (default: ~/.tsh-history)
    pub history: Option<PathBuf>,

    #[argh(switch)]
    /// neither load nor save command history
    pub no_history: bool,
}

/// Session settings.
///
/// Built from defaults, then the RC file, then command-line flags, each
/// layer overriding the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub alias_file: PathBuf,
    /// `None` disables history persistence.
    pub history_file: Option<PathBuf>,
    pub history_size: usize,
    pub prompt: String,
    pub colors: bool,
}

impl Default for Config {
    fn default() -> Self {
        let home = home_dir();
        Self {
            alias_file: home.join(ALIAS_FILE),
            history_file: Some(home.join(HISTORY_FILE)),
            history_size: DEFAULT_HISTORY_SIZE,
            prompt: DEFAULT_PROMPT.to_string(),
            colors: false,
        }
    }
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Resolve the session configuration for the given flags.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut config = Self::default();
        let rc = args.rc.clone().unwrap_or_else(|| home_dir().join(RC_FILE));
        config.load_rc(&rc)?;

        if let Some(path) = &args.aliases {
            config.alias_file = path.clone();
        }
        if let Some(path) = &args.history {
            config.history_file = Some(path.clone());
        }
        if args.no_history {
            config.history_file = None;
        }
        Ok(config)
    }

    /// Apply the RC file at `path`. A missing file leaves `self` unchanged.
    pub fn load_rc(&mut self, path: &Path) -> Result<()> {
        match fs::read_to_string(path) {
            Ok(text) => self.apply_rc(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no rc file at {}", path.display());
                Ok(())
            }
            Err(e) => {
                log::warn!("can't read rc file {}: {e}", path.display());
                Ok(())
            }
        }
    }

    /// Apply `KEY=VALUE` lines. Comments, blank lines and unknown keys are skipped.
    pub fn apply_rc(&mut self, text: &str) -> Result<()> {
        let pattern = r"^([A-Z_]+)=(.*)$";
        let re = Regex::new(pattern).with_context(|| format!("Invalid regex pattern: {pattern}"))?;

        for (number, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(caps) = re.captures(line) else {
                log::warn!("rc line {}: expected KEY=VALUE, got {line:?}", number + 1);
                continue;
            };
            let value = &caps[2];
            match &caps[1] {
                "COLORS" => match value {
                    "ON" => self.colors = true,
                    "OFF" => self.colors = false,
                    _ => log::warn!("rc line {}: COLORS must be ON or OFF", number + 1),
                },
                "PROMPT" => self.prompt = value.to_string(),
                "HISTSIZE" => match value.parse() {
                    Ok(size) => self.history_size = size,
                    Err(e) => log::warn!("rc line {}: bad HISTSIZE {value:?}: {e}", number + 1),
                },
                "ALIASES" => self.alias_file = PathBuf::from(value),
                "HISTORY" => self.history_file = Some(PathBuf::from(value)),
                key => log::warn!("rc line {}: unknown key {key}", number + 1),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc_overrides_defaults() {
        let mut config = Config::default();
        config
            .apply_rc(
                "# settings\n\
                 COLORS=ON\n\
                 PROMPT=dev: \n\
                 HISTSIZE=50\n\
                 ALIASES=/etc/tsh-alias\n\
                 HISTORY=/tmp/h\n",
            )
            .unwrap();

        assert!(config.colors);
        assert_eq!(config.prompt, "dev: ");
        assert_eq!(config.history_size, 50);
        assert_eq!(config.alias_file, PathBuf::from("/etc/tsh-alias"));
        assert_eq!(config.history_file, Some(PathBuf::from("/tmp/h")));
    }

    #[test]
    fn test_rc_skips_bad_lines() {
        let mut config = Config::default();
        config
            .apply_rc("COLORS=MAYBE\nHISTSIZE=lots\nUNKNOWN=1\nnot a setting\n\n")
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_rc_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.load_rc(&dir.path().join("absent")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_flags_override_rc() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join("rc");
        fs::write(&rc, "ALIASES=/from/rc\nHISTORY=/from/rc-history\nPROMPT=rc> \n").unwrap();

        let args = Args {
            aliases: Some(PathBuf::from("/from/flag")),
            rc: Some(rc),
            no_history: true,
            ..Args::default()
        };
        let config = Config::resolve(&args).unwrap();

        assert_eq!(config.alias_file, PathBuf::from("/from/flag"));
        assert_eq!(config.history_file, None);
        assert_eq!(config.prompt, "rc> ");
    }

    #[test]
    fn test_args_parse() {
        let args = Args::from_args(&["tsh"], &["-c", "ls -la", "--no-history"]).unwrap();
        assert_eq!(args.command.as_deref(), Some("ls -la"));
        assert!(args.no_history);
        assert_eq!(args.aliases, None);
    }
}

use crate::alias::AliasTable;
use crate::command::{CommandFactory, ExitCode};
use crate::config::Config;
use crate::env::Environment;
use crate::lexer::{self, DELIMITER};
use crate::prompt;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// One shell session.
///
/// Owns everything a session needs: the [`Environment`], the alias table
/// loaded at startup, the resolved [`Config`] and the [`CommandFactory`]
/// objects that are queried, in order, to create commands by name.
///
/// Example
/// ```no_run
/// use tshell::{Config, Interpreter};
/// let mut sh = Interpreter::with_config(Config::default());
/// let code = sh.dispatch("ls -la > listing.txt").unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    aliases: AliasTable,
    config: Config,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a session with a custom set of command factories, loading
    /// aliases from `config.alias_file`.
    pub fn new(config: Config, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        let aliases = AliasTable::load(&config.alias_file);
        Self::with_aliases(config, aliases, commands)
    }

    /// Create a session around an already loaded alias table.
    pub fn with_aliases(
        config: Config,
        aliases: AliasTable,
        commands: Vec<Box<dyn CommandFactory>>,
    ) -> Self {
        Self {
            env: Environment::new(),
            aliases,
            config,
            commands,
        }
    }

    /// Create a session with the default builtins and external commands.
    pub fn with_config(config: Config) -> Self {
        Self::new(config, default_commands())
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Whether a builtin asked the session to end.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Run a single command invocation by name with arguments.
    ///
    /// Returns the command's exit code or an error if the command cannot be created
    /// or fails to execute.
    pub fn run(&mut self, name: &str, args: &[&str]) -> anyhow::Result<ExitCode> {
        self.run_with_output(name, args, &mut io::stdout())
    }

    fn run_with_output(
        &mut self,
        name: &str,
        args: &[&str],
        stdout: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd.execute(stdout, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", name))
    }

    /// Tokenize `line`, resolve an alias in its first word and run it.
    ///
    /// A blank line does nothing and succeeds.
    pub fn dispatch(&mut self, line: &str) -> anyhow::Result<ExitCode> {
        self.dispatch_with_output(line, &mut io::stdout())
    }

    fn dispatch_with_output(&mut self, line: &str, stdout: &mut dyn Write) -> anyhow::Result<ExitCode> {
        let mut tokens = lexer::split_into_tokens(line, DELIMITER);
        if self.aliases.expand(&mut tokens) {
            // The expansion follows the alias name; run the expansion.
            tokens.delete(0);
        }
        let argv = tokens.into_inner();
        let Some((name, rest)) = argv.split_first() else {
            return Ok(0);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        self.run_with_output(name, &args, stdout)
    }

    /// Read-eval-print loop.
    ///
    /// Ctrl-C abandons the current line, Ctrl-D or an exit builtin ends the
    /// session. History is loaded before the first prompt and saved on the
    /// way out when a history file is configured.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let editor_config = rustyline::Config::builder()
            .max_history_size(self.config.history_size)?
            .auto_add_history(false)
            .build();
        let mut rl = DefaultEditor::with_config(editor_config).context("can't start line editor")?;

        if let Some(path) = &self.config.history_file {
            if let Err(e) = rl.load_history(path) {
                log::debug!("history not loaded from {}: {e}", path.display());
            }
        }

        while !self.env.should_exit {
            let prompt = prompt::render(&self.config, &self.env.current_dir);
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Err(e) = self.dispatch(&line) {
                        eprintln!("tsh: {e:#}");
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(path) = &self.config.history_file {
            if let Err(e) = rl.save_history(path) {
                log::warn!("history not saved to {}: {e}", path.display());
            }
        }
        Ok(())
    }

    /// End the session, releasing the alias table.
    pub fn teardown(self) {
        self.aliases.teardown();
    }
}

fn default_commands() -> Vec<Box<dyn CommandFactory>> {
    use crate::builtin::*;
    use crate::external::ExternalCommand;
    vec![
        Box::new(Factory::<Cd>::default()),
        Box::new(Factory::<Exit>::default()),
        Box::new(Factory::<Clear>::default()),
        Box::new(Factory::<ExternalCommand>::default()),
    ]
}

impl Default for Interpreter {
    /// Create a session with the default configuration and commands:
    /// - built-ins: `cd`, `exit` (`quit`, `logout`), `clear`
    /// - external command launcher
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

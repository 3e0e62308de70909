use anyhow::Context;
use std::io::Write;
use env_logger::Env;
use nix::sys::signal::{self, SigHandler, Signal};
use tshell::{Args, Config, Interpreter};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().filter_or("TSH_LOG", "warn")).init();

    let args: Args = argh::from_env();
    let config = Config::resolve(&args)?;

    // SAFETY: ignoring a signal installs no handler. Children restore the
    // default before exec.
    unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) }
        .context("can't ignore SIGINT")?;

    let mut shell = Interpreter::with_config(config);
    if let Some(line) = &args.command {
        let code = match shell.dispatch(line) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("tsh: {e:#}");
                1
            }
        };
        shell.teardown();
        std::io::stdout().flush()?;
        std::process::exit(code);
    }

    shell.repl()?;
    shell.teardown();
    Ok(())
}

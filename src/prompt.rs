use crate::config::Config;
use std::path::Path;

const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Render the prompt for a session sitting in `cwd`.
///
/// Only the last component of the working directory is shown; the root
/// directory shows as `/`.
pub fn render(config: &Config, cwd: &Path) -> String {
    let dir = cwd
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "/".to_string());

    if config.colors {
        format!("{CYAN}{}{dir}){RESET}> ", config.prompt)
    } else {
        format!("{}{dir})> ", config.prompt)
    }
}

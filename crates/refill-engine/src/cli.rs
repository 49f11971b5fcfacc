//! Script runner and interactive prompt on top of `CommandExecutor`.

use crate::executor::CommandExecutor;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Where command output and failures are written.
#[derive(Clone, Copy)]
pub struct Console {
    pub out: fn(&str),
    pub err: fn(&str),
}

impl Console {
    pub fn stdio() -> Self {
        Self {
            out: |msg| println!("{}", msg),
            err: |msg| eprintln!("{}", msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Cannot read script {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Line {line} ({command}): {message}")]
    Aborted {
        line: usize,
        command: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptOptions {
    /// Abort at the first failing line instead of reporting and continuing.
    pub stop_on_error: bool,
    /// Print each command before its output.
    pub echo: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    pub executed: usize,
    pub failed: usize,
}

/// Commands the script runner never sends to the executor.
fn is_skipped(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

pub async fn run_file(
    executor: &mut CommandExecutor,
    console: Console,
    path: &Path,
    options: ScriptOptions,
) -> Result<ScriptSummary, ScriptError> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    run_script(executor, console, &source, options).await
}

/// Run one command per line. `#` starts a comment line.
pub async fn run_script(
    executor: &mut CommandExecutor,
    console: Console,
    source: &str,
    options: ScriptOptions,
) -> Result<ScriptSummary, ScriptError> {
    let mut summary = ScriptSummary::default();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if is_skipped(line) {
            continue;
        }
        let number = index + 1;
        if options.echo {
            (console.out)(&format!("> {}", line));
        }
        summary.executed += 1;

        match executor.execute_line(line).await {
            Ok(output) => {
                if !output.is_empty() {
                    (console.out)(&output);
                }
            }
            Err(e) if options.stop_on_error => {
                return Err(ScriptError::Aborted {
                    line: number,
                    command: line.to_string(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                summary.failed += 1;
                warn!(line = number, "Script command failed: {}", e);
                (console.err)(&format!("Line {}: {}", number, e));
            }
        }
    }
    debug!(executed = summary.executed, failed = summary.failed, "Script finished");
    Ok(summary)
}

pub struct ReplOptions<'a> {
    pub banner: &'a [&'a str],
    pub prompt: &'a str,
    /// Shown instead of `prompt` while a delete awaits confirmation.
    pub confirm_prompt: &'a str,
    pub exit_commands: &'a [&'a str],
}

/// Interactive loop until EOF, an exit command or Ctrl-C.
pub async fn run_repl(
    executor: &mut CommandExecutor,
    console: Console,
    options: ReplOptions<'_>,
) -> std::io::Result<()> {
    for line in options.banner {
        (console.out)(line);
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let prompt = if executor.awaiting_confirmation() {
            options.confirm_prompt
        } else {
            options.prompt
        };
        print!("{}", prompt);
        std::io::stdout().flush()?;

        let next = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(raw) = next else {
            break;
        };
        let line = raw.trim();
        if options.exit_commands.contains(&line) {
            break;
        }
        if is_skipped(line) {
            continue;
        }
        match executor.execute_line(line).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => (console.out)(&output),
            Err(e) => (console.err)(&format!("Error: {}", e)),
        }
    }
    Ok(())
}

use anyhow::{Context, bail};
use clap::Parser;
use refill_engine::browser::Browser;
use refill_engine::cli::{self, Console, ReplOptions, ScriptOptions};
use refill_engine::config::ConfigLoader;
use refill_engine::executor::CommandExecutor;
use refill_engine::store::{FileStore, KeyValueStore, MemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "refill", version, about = "Record form input and replay it into pages")]
struct Args {
    /// Config file (defaults to $REFILL_CONFIG, ./refill.yaml, ~/.refill/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the durable profile store (overrides $REFILL_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep profiles in memory only
    #[arg(long)]
    memory: bool,

    /// Script to execute (non-interactive mode)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Report failing script lines and carry on instead of aborting
    #[arg(long)]
    keep_going: bool,

    /// Print each script command before its output
    #[arg(long)]
    echo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let (config, _) = ConfigLoader::new()
        .with_path(args.config)
        .with_data_dir(args.data_dir)
        .load()
        .await
        .context("loading config")?;

    let durable: Arc<dyn KeyValueStore> = if args.memory {
        Arc::new(MemoryStore::new())
    } else {
        let path = config.storage.durable_path();
        Arc::new(
            FileStore::open(&path)
                .await
                .with_context(|| format!("opening profile store {}", path.display()))?,
        )
    };
    info!(memory = args.memory, "Profile store ready");

    let browser = Browser::launch(&config, durable);
    let mut executor = CommandExecutor::new(browser);
    let console = Console::stdio();

    if let Some(path) = args.file {
        let summary = cli::run_file(
            &mut executor,
            console,
            &path,
            ScriptOptions {
                stop_on_error: !args.keep_going,
                echo: args.echo,
            },
        )
        .await?;
        info!(executed = summary.executed, failed = summary.failed, "Script done");
        if summary.failed > 0 {
            bail!("{} of {} commands failed", summary.failed, summary.executed);
        }
    } else {
        cli::run_repl(
            &mut executor,
            console,
            ReplOptions {
                banner: &[
                    "Refill ready. Open a page with 'open <page.yaml>', then 'record <name>'.",
                    "Type 'help' for commands, 'exit' or 'quit' to close.",
                ],
                prompt: "refill> ",
                confirm_prompt: "confirm (yes/no)> ",
                exit_commands: &["exit", "quit"],
            },
        )
        .await
        .context("reading commands")?;
    }
    Ok(())
}

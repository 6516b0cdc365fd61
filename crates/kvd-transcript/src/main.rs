use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kvd_domain::config::Config;
use kvd_transcript::{get, put, quote, run, ToolConfig};

/// kvtool — GET / PUT / RUN / QUOTE against a running kvdrived.
/// Every command is silent on failure: a bad argument count, a missing
/// transcript, or an unreachable driver all just exit cleanly.
#[derive(Debug, Parser)]
#[command(name = "kvtool", version, about)]
struct Cli {
    /// Echo the driver's reply to stdout.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the most recent FILE turn (or a specific one) to a local path.
    Get {
        /// Either `<out_path>` or `<turn_id> <out_path>`.
        args: Vec<String>,
    },
    /// Upload a local file as a new FILE turn.
    Put { path: PathBuf },
    /// Execute the most recent PYTHON/BASH turn (or a specific one).
    Run {
        /// Optional `<turn_id>`.
        args: Vec<String>,
    },
    /// Quote an existing turn back into the transcript.
    Quote { turn_id: u64 },
}

fn load_config() -> Config {
    let config_path = std::env::var("KVD_CONFIG").unwrap_or_else(|_| "config.toml".into());
    if std::path::Path::new(&config_path).exists() {
        std::fs::read_to_string(&config_path)
            .ok()
            .and_then(|raw| toml::from_str(&raw).ok())
            .unwrap_or_default()
    } else {
        Config::default()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let config = load_config();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let tool_cfg = ToolConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        frame_ceiling: config.generation.frame_ceiling_bytes,
        verbose: cli.verbose,
    };

    match cli.command {
        Command::Get { args } => match args.as_slice() {
            [out] => get(None, &PathBuf::from(out), &cwd).await,
            [turn_id, out] => {
                if let Ok(id) = turn_id.parse::<u64>() {
                    get(Some(id), &PathBuf::from(out), &cwd).await;
                }
            }
            _ => {}
        },
        Command::Put { path } => put(&path, &cwd, &tool_cfg).await,
        Command::Run { args } => match args.as_slice() {
            [] => run(None, &cwd, &tool_cfg).await,
            [turn_id] => {
                if let Ok(id) = turn_id.parse::<u64>() {
                    run(Some(id), &cwd, &tool_cfg).await;
                }
            }
            _ => {}
        },
        Command::Quote { turn_id } => quote(turn_id, &cwd, &tool_cfg).await,
    }
}

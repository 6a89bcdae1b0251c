use agentlog_cli::{open_input, replay_events};
use agentlog_core::{
    list_sessions, ExchangeLogger, ExportFormat, LoggerConfig, SessionTranscript,
    TranscriptExporter, TranscriptRenderer,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::subscriber;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

/// Session and exchange logs for conversational agent runs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded NDJSON event stream into a session log.
    Replay {
        /// Event stream file, or `-` for stdin.
        input: PathBuf,
        /// Log directory (overrides AGENTLOG_DIR).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List session log files.
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print a session log as a tree.
    Show { file: PathBuf },
    /// Print a session log as YAML or JSON.
    Export {
        file: PathBuf,
        #[arg(long, default_value = "yaml")]
        format: ExportFormat,
    },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,agentlog_core=debug"));
    let subscriber = Registry::default()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    subscriber::set_global_default(subscriber)
        .context("Failed to set global default tracing subscriber")
}

fn load_config(dir: Option<PathBuf>) -> Result<LoggerConfig> {
    let config = LoggerConfig::from_env().context("Invalid logger configuration")?;
    Ok(match dir {
        Some(dir) => config.with_log_dir(dir),
        None => config,
    })
}

fn main() -> Result<()> {
    dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    match cli.command {
        Command::Replay { input, dir } => {
            let config = load_config(dir)?;
            let mut logger =
                ExchangeLogger::new(config).context("Failed to create exchange logger")?;
            let reader = open_input(&input)?;
            let summary = replay_events(&mut logger, reader)?;
            match summary.log_path {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("No session was initialised; nothing was logged."),
            }
        }
        Command::List { dir } => {
            let config = load_config(dir)?;
            let files = list_sessions(&config.log_dir).with_context(|| {
                format!("Failed to list sessions in {}", config.log_dir.display())
            })?;
            for file in files {
                println!("{}", file.display());
            }
        }
        Command::Show { file } => {
            let transcript = SessionTranscript::load(&file)
                .with_context(|| format!("Failed to read session log: {}", file.display()))?;
            print!("{}", transcript.render_as_ascii_tree());
        }
        Command::Export { file, format } => {
            let transcript = SessionTranscript::load(&file)
                .with_context(|| format!("Failed to read session log: {}", file.display()))?;
            let rendered = TranscriptExporter::render(&transcript, format)?;
            print!("{rendered}");
        }
    }

    Ok(())
}

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_stream::StreamExt;
use wp_log_tail::config::{Config, DEFAULT_CONFIG};
use wp_log_tail::{
    FilterSpec, FollowOptions, Level, LogEntry, LogSource, LogStream, logging, server,
};

#[derive(Parser)]
#[command(name = "wp-log-tail", version, about = "Tail and classify WordPress / PHP error logs")]
struct Cli {
    /// TOML config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP poll endpoint
    Serve {
        /// Overrides [server] bind
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Print classified entries from a log file
    Tail {
        path: PathBuf,

        /// Minimum severity to print
        #[arg(long, short, default_value = "debug")]
        level: Level,

        /// Keep watching for new lines
        #[arg(long, short)]
        follow: bool,

        /// Skip existing content
        #[arg(long)]
        from_end: bool,
    },
    /// Print the reference configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::defaults(),
    };
    logging::init(cli.debug, config.logging.level.as_deref());

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::serve(&config).await.context("server failed")?;
        }
        Command::Tail {
            path,
            level,
            follow,
            from_end,
        } => {
            let source = if from_end {
                LogSource::at_end(&path)?
            } else {
                LogSource::new(&path)
            };
            let filter = FilterSpec::new(level);
            if follow {
                follow_file(source, filter, &config).await;
            } else {
                let outcome = config.engine().drain(&source, filter)?;
                print_entries(&outcome.entries);
            }
        }
        Command::Config => print!("{}", DEFAULT_CONFIG.trim_start()),
    }

    Ok(())
}

async fn follow_file(source: LogSource, filter: FilterSpec, config: &Config) {
    let mut stream = LogStream::new(
        source,
        FollowOptions {
            filter,
            poll_interval: config.poll_interval(),
            engine: config.engine(),
        },
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            batch = stream.next() => match batch {
                Some(Ok(entries)) => print_entries(&entries),
                Some(Err(e)) => eprintln!("warning: {}", e),
                None => break,
            },
        }
    }
}

fn print_entries(entries: &[LogEntry]) {
    for entry in entries {
        println!(
            "{} {:>7} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.level,
            entry.message
        );
    }
}

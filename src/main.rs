use awslogger::config::{self, ConfigOverrides};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pipe logs from various sources into a log stream. Lines are read from STDIN
/// unless --udp is given.
///
/// Example with journalctl:
///
///     journalctl -o short-iso -f | awslogger --group my-app --region us-east-1
#[derive(Parser)]
#[command(name = "awslogger", version, verbatim_doc_comment)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    flags: Flags,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Flags {
    /// Log group name, will be created if it doesn't exist
    #[arg(long, global = true)]
    group: Option<String>,

    /// Log stream name, will be created if it doesn't exist. Defaults to the hostname
    #[arg(long, global = true)]
    stream: Option<String>,

    #[arg(long, global = true)]
    region: Option<String>,

    /// Send requests here instead of the regional endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Timestamp format of the leading field (strftime, iso8601, epoch, epoch_ms)
    #[arg(long = "time-fmt", global = true)]
    time_fmt: Option<String>,

    #[arg(long, global = true)]
    read_buffer_size: Option<usize>,

    #[arg(long, global = true)]
    message_buffer_size: Option<usize>,

    /// Max events per put
    #[arg(long, global = true)]
    max_put_size: Option<usize>,

    /// Idle time before a partial batch is sent, in milliseconds
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,

    /// Listen for datagrams on this address instead of reading STDIN
    #[arg(long, value_name = "ADDR", global = true)]
    udp: Option<String>,
}

impl From<Flags> for ConfigOverrides {
    fn from(flags: Flags) -> Self {
        Self {
            group: flags.group,
            stream: flags.stream,
            region: flags.region,
            endpoint: flags.endpoint,
            time_format: flags.time_fmt,
            read_buffer_size: flags.read_buffer_size,
            message_buffer_size: flags.message_buffer_size,
            max_put_size: flags.max_put_size,
            debounce: flags.debounce_ms.map(Duration::from_millis),
            udp_listen: flags.udp,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    Run,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // STDIN carries the data, keep diagnostics on STDERR
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "awslogger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run) | None => {
            let config_path = config::resolve_config_path(cli.config.as_deref());
            if let Some(path) = &config_path {
                info!(config_path = %path.display(), "Loading configuration");
            }

            let overrides = ConfigOverrides::from(cli.flags);
            let config = config::load(config_path.as_deref(), &overrides)?;

            let stats = match awslogger::cli::run::run(&config).await {
                Ok(stats) => stats,
                Err(e) => {
                    error!(error = %e, "Shipper failed to start");
                    return Err(e.into());
                }
            };
            info!(
                events_delivered = stats.events_delivered,
                batches_failed = stats.batches_failed,
                "Done"
            );

            // A pending blocking read on STDIN would keep the runtime from shutting down
            std::process::exit(0);
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                awslogger::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}

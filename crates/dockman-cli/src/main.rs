//! dockman - Docker and Compose dashboard

use clap::{Parser, Subcommand};
use dockman_cli::commands::{self, ProjectOp};
use dockman_cli::logging;
use dockman_config::GlobalConfig;
use dockman_core::Controller;
use dockman_provider::{create_runtime, open_runtime};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dockman")]
#[command(author, version, about = "Docker and Compose dashboard", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Docker socket path or URL (overrides runtime.socket)
    #[arg(long, global = true)]
    socket: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log file used while the dashboard is open (overrides logging.file)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List containers grouped by Compose project
    Ps {
        /// Include stopped containers
        #[arg(short, long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start a container
    Start {
        /// Container name or ID
        container: String,
    },

    /// Stop a container
    Stop {
        /// Container name or ID
        container: String,
    },

    /// Restart a container
    Restart {
        /// Container name or ID
        container: String,
    },

    /// Remove a container
    Rm {
        /// Container name or ID
        container: String,
        /// Force removal even if running
        #[arg(short, long)]
        force: bool,
    },

    /// Apply an operation to every container of a Compose project
    Project {
        #[arg(value_enum)]
        op: ProjectOp,
        /// Project name (case-insensitive)
        name: String,
    },

    /// Print a container's logs
    Logs {
        /// Container name or ID
        container: String,
        /// Keep streaming new output
        #[arg(short, long)]
        follow: bool,
        /// Number of lines from the end, or "all"
        #[arg(long)]
        tail: Option<String>,
    },

    /// Show the configuration or write the default config file
    Config {
        /// Create the config file with default values
        #[arg(long)]
        write_default: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = commands::config_path(cli.config.as_deref())?;

    // Config command runs before the file is parsed so a broken file can be inspected
    if let Some(Commands::Config { write_default }) = &cli.command {
        logging::init_stderr(logging::build_filter(cli.verbose, None));
        commands::config(&config_path, *write_default, &mut std::io::stdout())?;
        return Ok(());
    }

    let mut config = GlobalConfig::load_from(&config_path)?;
    if let Some(socket) = cli.socket {
        config.runtime.socket = socket;
    }
    if let Some(log_file) = cli.log_file {
        config.logging.file = Some(log_file);
    }

    let filter = logging::build_filter(cli.verbose, config.logging.level.as_deref());

    let Some(command) = cli.command else {
        // The dashboard owns the terminal; diagnostics go to a file
        logging::init_file(filter, &config.log_file()?)?;
        tracing::info!("starting dashboard against {}", config.runtime.socket);
        let runtime = open_runtime(&config)?;
        dockman_tui::run(runtime, config).await?;
        return Ok(());
    };

    logging::init_stderr(filter);
    let runtime = create_runtime(&config).await?;
    let controller = Controller::from_config(runtime, &config);

    match command {
        Commands::Ps { all, json } => {
            commands::ps(&controller, all, json, &mut std::io::stdout()).await?;
        }
        Commands::Start { container } => commands::start(&controller, &container).await?,
        Commands::Stop { container } => commands::stop(&controller, &container).await?,
        Commands::Restart { container } => commands::restart(&controller, &container).await?,
        Commands::Rm { container, force } => {
            commands::remove(&controller, &container, force).await?;
        }
        Commands::Project { op, name } => {
            commands::project(&controller, op, &name).await?;
        }
        Commands::Logs {
            container,
            follow,
            tail,
        } => {
            commands::logs(
                &controller,
                &config,
                &container,
                follow,
                tail,
                &mut std::io::stdout(),
            )
            .await?;
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }

    Ok(())
}

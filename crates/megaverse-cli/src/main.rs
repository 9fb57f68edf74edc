//! Megaverse — entry point.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use megaverse::{fetch_goal, ConfigOverrides, Dispatcher, MegaverseClient, MegaverseConfig};
use megaverse_cli::{plan_json, render_goal};

#[derive(Parser)]
#[command(
    name = "megaverse",
    about = "Megaverse — build a goal grid on the remote map, one cell at a time",
    version
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Connection settings. Each falls back to its environment variable.
#[derive(Args)]
struct ConfigArgs {
    /// Goal source URL. Also reads GOAL_URL.
    #[arg(long, global = true)]
    goal_url: Option<String>,

    /// Base URL of the action endpoints. Also reads BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Candidate identifier sent with every request. Also reads CANDIDATE_ID.
    #[arg(long, global = true)]
    candidate_id: Option<String>,

    /// Retries per request after the first attempt (default 3).
    /// Also reads MEGAVERSE_MAX_RETRIES.
    #[arg(long, global = true)]
    max_retries: Option<u32>,

    /// First rate-limit backoff in milliseconds, doubled on each 429 (default 1000).
    /// Also reads MEGAVERSE_BASE_DELAY_MS.
    #[arg(long, global = true)]
    base_delay_ms: Option<u64>,

    /// Per-request timeout in milliseconds. No timeout when unset.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

impl From<ConfigArgs> for ConfigOverrides {
    fn from(args: ConfigArgs) -> Self {
        ConfigOverrides {
            goal_url: args.goal_url,
            base_url: args.base_url,
            candidate_id: args.candidate_id,
            max_retries: args.max_retries,
            base_delay_ms: args.base_delay_ms,
            timeout_ms: args.timeout_ms,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the goal and place every cell (default).
    Run,

    /// Fetch the goal and print it.
    Goal {
        /// Print the raw matrix as JSON instead of a glyph grid.
        #[arg(long)]
        json: bool,
    },

    /// Fetch the goal and print the requests a run would send, without sending them.
    Plan,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   megaverse completions bash > ~/.local/share/bash-completion/completions/megaverse
    ///   megaverse completions zsh > ~/.zfunc/_megaverse
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let overrides: ConfigOverrides = cli.config.into();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = MegaverseConfig::from_env(overrides)?;
            tracing::info!(
                "Megaverse run: goal={} base={} max_retries={}",
                config.goal_url,
                config.base_url,
                config.retry.max_retries
            );
            megaverse::run(&config).await?;
            tracing::info!("Run complete");
        }

        Commands::Goal { json } => {
            let config = MegaverseConfig::from_env(overrides)?;
            let client = MegaverseClient::new(config.retry, config.timeout);
            let goal = fetch_goal(&client, &config.goal_url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&goal)?);
            } else {
                print!("{}", render_goal(&goal));
            }
        }

        Commands::Plan => {
            let config = MegaverseConfig::from_env(overrides)?;
            let client = MegaverseClient::new(config.retry, config.timeout);
            let goal = fetch_goal(&client, &config.goal_url).await?;
            let plan = Dispatcher::from_config(client, &config).plan(&goal);
            println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "megaverse", &mut std::io::stdout());
        }
    }

    Ok(())
}

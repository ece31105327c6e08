mod commands;
mod logging;
mod output;

use clap::{Args, Parser, Subcommand};
use miette::Result;
use shibako_core::translate::DeepL;
use std::path::PathBuf;

use crate::output::Output;

#[derive(Parser)]
#[command(name = "shibako")]
#[command(about = "Shibako trigger phrase bot for Discord")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Trigger document path
    #[arg(
        long,
        short = 'c',
        env = "SHIBAKO_CONFIG",
        default_value = "config.json",
        global = true
    )]
    config: PathBuf,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and answer messages
    Run(RunArgs),
    /// Validate the trigger document and list its rules
    Check {
        /// Command prefix; phrases starting with it are reported
        #[arg(long, env = "SHIBAKO_PREFIX", default_value = "!")]
        prefix: String,
    },
    /// Show the reply a message would get, without sending anything
    Simulate {
        /// Message text as a user would type it
        text: String,

        /// Author user id, used for the rude mention
        #[arg(long = "as", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        author: u64,

        /// Command prefix
        #[arg(long, env = "SHIBAKO_PREFIX", default_value = "!")]
        prefix: String,

        /// Seed for the rude roll, for repeatable output
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Discord bot token
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Command prefix
    #[arg(long, env = "SHIBAKO_PREFIX", default_value = "!")]
    pub prefix: String,

    /// DeepL API key; translation is disabled without one
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    pub deepl_api_key: Option<String>,

    /// DeepL translate endpoint
    #[arg(long, env = "DEEPL_API_URL", default_value = DeepL::FREE_ENDPOINT)]
    pub deepl_api_url: String,

    /// User ids allowed to reload the trigger document
    #[arg(
        long = "admin",
        env = "SHIBAKO_ADMIN_USERS",
        value_delimiter = ',',
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub admins: Vec<u64>,

    /// Directory for the rolling log file
    #[arg(long, env = "SHIBAKO_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(3)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    let log_dir = match &cli.command {
        Commands::Run(args) => Some(args.log_dir.clone()),
        _ => None,
    };
    logging::init_logging(cli.debug, log_dir.as_deref());

    let output = Output::new();
    match cli.command {
        Commands::Run(args) => commands::run(&cli.config, args).await,
        Commands::Check { prefix } => commands::check(&cli.config, &prefix, &output).await,
        Commands::Simulate {
            text,
            author,
            prefix,
            seed,
        } => commands::simulate(&cli.config, &text, author, &prefix, seed, &output).await,
    }
}

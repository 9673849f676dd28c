//! Trendpress command-line launcher
//!
//! Ranks trend candidates, vets them against stored content, enriches
//! drafts with internal links, and runs generation jobs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use trendpress_logging::{init_logging, LogConfig};

mod cli;

use cli::CommandContext;

#[derive(Parser, Debug)]
#[command(name = "trendpress", version, about = "Trend-driven draft generation and vetting")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Configuration file (default: ~/.trendpress/config.toml)
    #[arg(long, global = true, env = "TRENDPRESS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank candidate topics by estimated revenue potential
    Rank {
        /// JSON file of candidate topics (default: configured signals file)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Show at most this many topics
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether a keyword is already covered by stored content
    Check {
        keyword: String,

        /// Category of the planned post
        #[arg(short, long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List published posts related to a keyword
    Links {
        keyword: String,

        #[arg(short, long)]
        category: Option<String>,

        /// Slug to leave out (usually the post being written)
        #[arg(long)]
        exclude: Option<String>,

        /// Maximum links (default: [links].default_limit)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Insert related-post links into a markdown draft
    Inject {
        /// Markdown file to enrich
        file: PathBuf,

        /// Keyword the draft is about
        #[arg(short, long)]
        keyword: String,

        #[arg(short, long)]
        category: Option<String>,

        /// Slug of the draft itself
        #[arg(long)]
        exclude: Option<String>,

        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output links and markdown as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a generation job (top trend, a batch, or one keyword)
    Run {
        /// Generate for this keyword instead of the trend feed
        #[arg(short, long, conflicts_with = "batch")]
        keyword: Option<String>,

        /// Category for --keyword
        #[arg(short, long, requires = "keyword")]
        category: Option<String>,

        /// Process the top N trending topics
        #[arg(short, long)]
        batch: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recorded jobs
    Jobs {
        /// Show one job by id or id prefix
        #[arg(long, conflicts_with_all = ["dismiss", "clear"])]
        id: Option<String>,

        /// Remove one job from the history
        #[arg(long, conflicts_with = "clear")]
        dismiss: Option<String>,

        /// Remove every recorded job
        #[arg(long)]
        clear: bool,

        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Rank { json, .. } => *json,
        Commands::Check { json, .. } => *json,
        Commands::Links { json, .. } => *json,
        Commands::Inject { json, .. } => *json,
        Commands::Run { json, .. } => *json,
        Commands::Jobs { json, .. } => *json,
        Commands::Config { json } => *json,
    }
}

fn run_command(cli: Cli) -> Result<()> {
    let ctx = CommandContext::load(cli.config)?;

    match cli.command {
        Commands::Rank { file, limit, json } => {
            cli::rank::run(cli::rank::RankArgs { file, limit, json }, &ctx)
        }
        Commands::Check {
            keyword,
            category,
            json,
        } => cli::vet::check(
            cli::vet::CheckArgs {
                keyword,
                category,
                json,
            },
            &ctx,
        ),
        Commands::Links {
            keyword,
            category,
            exclude,
            limit,
            json,
        } => cli::vet::links(
            cli::vet::LinksArgs {
                keyword,
                category,
                exclude,
                limit,
                json,
            },
            &ctx,
        ),
        Commands::Inject {
            file,
            keyword,
            category,
            exclude,
            limit,
            output,
            json,
        } => cli::vet::inject(
            cli::vet::InjectArgs {
                file,
                keyword,
                category,
                exclude,
                limit,
                output,
                json,
            },
            &ctx,
        ),
        Commands::Run {
            keyword,
            category,
            batch,
            json,
        } => cli::run::run(
            cli::run::RunArgs {
                keyword,
                category,
                batch,
                json,
            },
            &ctx,
        ),
        Commands::Jobs {
            id,
            dismiss,
            clear,
            limit,
            json,
        } => cli::jobs::run(
            cli::jobs::JobsArgs {
                id,
                dismiss,
                clear,
                limit,
                json,
            },
            &ctx,
        ),
        Commands::Config { json } => cli::config::run(json, &ctx),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(err) = init_logging(LogConfig {
        app_name: "trendpress",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}

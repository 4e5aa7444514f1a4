//! Content crew CLI: run the content pipeline and manage the knowledge base.
//!
//! All behaviour lives in crew-core; this binary only parses arguments,
//! installs logging and builds the shared `AppState`.

use clap::{Parser, Subcommand};
use crew_cli::commands;

/// Content crew: multi-agent blog content production
#[derive(Parser)]
#[command(name = "crew", version, about = "Content crew: multi-agent blog content production")]
pub struct Cli {
    /// Directory holding settings.yaml and rag_config.yaml
    #[arg(long, env = "CREW_CONFIG_DIR", default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Research, write, edit, optimise and review an article
    Create {
        /// Article topic
        #[arg(long)]
        topic: String,
        /// Target length in words
        #[arg(long)]
        length: Option<u64>,
        /// Output markdown file (defaults to <output_directory>/<slug>.md)
        #[arg(long)]
        output: Option<String>,
        /// File describing the author's writing style
        #[arg(long)]
        style: Option<String>,
    },

    /// Ingest a blog article, a PDF or a directory of them
    Ingest {
        /// File or directory to ingest
        path: String,
        /// Document kind: blog, pdf or auto
        #[arg(long, default_value = "auto")]
        kind: String,
    },

    /// Query the knowledge base
    Query {
        /// Query text
        text: String,
        /// Collection: style, knowledge (both when omitted)
        #[arg(long)]
        collection: Option<String>,
        /// Number of results
        #[arg(short = 'n', long = "n-results")]
        n_results: Option<usize>,
    },

    /// List registered agents and skills
    Agents,

    /// Show knowledge base statistics
    Stats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crew_core=info,crew_cli=info".into()),
        )
        .init();

    let result = match cli.command {
        Some(command) => match commands::init_state(&cli.config).await {
            Ok(state) => match command {
                Commands::Create {
                    topic,
                    length,
                    output,
                    style,
                } => commands::create::run(&state, &topic, length, output.as_deref(), style.as_deref()).await,
                Commands::Ingest { path, kind } => commands::ingest::run(&state, &path, &kind).await,
                Commands::Query {
                    text,
                    collection,
                    n_results,
                } => commands::query::run(&state, &text, collection.as_deref(), n_results).await,
                Commands::Agents => commands::agents::list(&state).await,
                Commands::Stats => commands::stats::show(&state).await,
            },
            Err(e) => Err(e),
        },
        None => {
            // No subcommand: show help
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

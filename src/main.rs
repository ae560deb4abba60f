use clap::{Parser, Subcommand};
use news_qa::Result;
use news_qa::commands::{ask_question, ingest_news};
use news_qa::config::{Config, get_config_dir, show_config};

#[derive(Parser)]
#[command(name = "news-qa")]
#[command(about = "Answer questions about today's news from scraped articles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the news section, chunk and embed the articles, and rebuild the embedding store
    Ingest,
    /// Ask a question on the console and answer it from the embedding store
    Ask,
    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(get_config_dir()?)?;

    match cli.command {
        Commands::Ingest => {
            ingest_news(&config)?;
        }
        Commands::Ask => {
            ask_question(&config)?;
        }
        Commands::Config => {
            show_config(&config);
        }
    }

    Ok(())
}

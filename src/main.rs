use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use paperqa::config::{Config, EmbedderKind};
use paperqa::embed::ConfiguredEmbedder;
use paperqa::lang::Language;
use paperqa::pipeline::{ArxivPipeline, Request};

/// Ask questions about arXiv papers in your own language.
#[derive(Parser)]
#[command(name = "paperqa", version, about)]
struct Cli {
    /// Embedding backend (overrides PAPERQA_EMBEDDER)
    #[arg(long, value_enum, global = true)]
    embedder: Option<EmbedderKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search arXiv for the query, then answer the question from the papers found
    Ask {
        /// Research topic used to find papers (arXiv syntax such as OR is allowed)
        #[arg(long)]
        query: String,
        /// Question to answer from the papers
        #[arg(long)]
        question: String,
        /// Language of the query and question (name or code)
        #[arg(long, default_value_t = Language::English)]
        input_language: Language,
        /// Language of the answer (name or code)
        #[arg(long, default_value_t = Language::English)]
        output_language: Language,
    },
    /// List supported languages
    Languages,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("paperqa=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Languages => {
            for lang in Language::ALL {
                println!("{:<10} {}", lang.name(), lang.code());
            }
        }
        Command::Ask {
            query,
            question,
            input_language,
            output_language,
        } => {
            let mut config = Config::from_env()?;
            if let Some(kind) = cli.embedder {
                config.embedder = kind;
            }

            let embedder = Arc::new(ConfiguredEmbedder::load(config.embedder).await?);
            let pipeline = ArxivPipeline::from_config(&config, embedder)?;

            if (!input_language.is_pivot() || !output_language.is_pivot())
                && let Err(e) = pipeline.translator().preload().await
            {
                warn!(error = %e, "translation catalog unavailable, answering untranslated");
            }

            info!(%input_language, %output_language, "answering");
            let answer = pipeline
                .answer(&Request {
                    query,
                    question,
                    input_language,
                    output_language,
                })
                .await;
            println!("{answer}");
        }
    }
    Ok(())
}

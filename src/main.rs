use anyhow::Result;
use clap::Parser;
use delivery_rca::analyzer::RootCauseAnalyzer;
use delivery_rca::audit::AuditLog;
use delivery_rca::classifier::Classifier;
use delivery_rca::engine::{AnalysisEngine, EngineConfig};
use delivery_rca::integrator::Integrator;
use delivery_rca::llm::{LlmClient, LlmConfig};
use delivery_rca::loader::Loader;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "delivery-rca")]
#[command(about = "Root-cause analytics for delivery failures and delays")]
struct Args {
    /// One query to answer; omit for the interactive session
    query: Option<String>,

    /// Directory holding the eight source CSV files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory audit records are written to
    #[arg(long, default_value = "audit")]
    audit_dir: PathBuf,

    /// Disable audit persistence
    #[arg(long)]
    no_audit: bool,

    /// API key for the AI collaborator (falls back to rule-based parsing
    /// when absent)
    #[arg(long, env = "DELIVERY_RCA_API_KEY")]
    api_key: Option<String>,

    /// Chat-completions model name
    #[arg(long, default_value = "sonar")]
    model: String,

    /// Chat-completions endpoint base URL
    #[arg(long, default_value = "https://api.perplexity.ai")]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("Loading data from {}", args.data_dir.display());
    let tables = Loader::new(&args.data_dir).load()?;
    let snapshot = Integrator::new(Classifier::default()).build(&tables)?;
    info!(
        "Integrated {} orders ({} cities, {} clients, {} warehouses)",
        snapshot.records.len(),
        snapshot.entities.cities.len(),
        snapshot.entities.clients.len(),
        snapshot.entities.warehouses.len()
    );

    let mut analyzer = RootCauseAnalyzer::new(snapshot, AnalysisEngine::new(EngineConfig::default()));

    match args.api_key {
        Some(api_key) if !api_key.trim().is_empty() => {
            let config = LlmConfig {
                api_key,
                model: args.model.clone(),
                base_url: args.base_url.clone(),
            };
            analyzer = analyzer.with_llm(LlmClient::new(config));
            info!("AI enhancement enabled (model {})", args.model);
        }
        _ => warn!("No API key configured, running rule-based only"),
    }
    if !args.no_audit {
        analyzer = analyzer.with_audit(AuditLog::new(&args.audit_dir));
    }

    match args.query {
        Some(query) => {
            let response = analyzer.process_query(&query).await;
            println!("{}", response);
        }
        None => interactive(&analyzer).await?,
    }

    Ok(())
}

const SAMPLE_QUERIES: &[&str] = &[
    "Why are deliveries failing in Mumbai?",
    "Compare Mumbai and Delhi last month",
    "Show the delivery failure trend in August",
    "What happens if we onboard 20,000 extra orders in Mumbai?",
];

async fn interactive(analyzer: &RootCauseAnalyzer) -> Result<()> {
    println!("Delivery root-cause analytics. Type a question, 'samples' for examples, 'quit' to exit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        match input {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("Ask about failures, delays, comparisons, trends or projections.");
                println!("Commands: samples, help, quit");
            }
            "samples" => {
                for sample in SAMPLE_QUERIES {
                    println!("  {}", sample);
                }
            }
            query => {
                let response = analyzer.process_query(query).await;
                println!("{}", response);
            }
        }
    }
    Ok(())
}

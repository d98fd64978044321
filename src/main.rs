use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use noc_oracle::core::config::AppPaths;
use noc_oracle::manual::ManualSpec;
use noc_oracle::oracle::Solution;
use noc_oracle::rag::document::{CATEGORY, ERROR_CODE};
use noc_oracle::server;
use noc_oracle::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "noc-oracle",
    version,
    about = "Answer telecom alarms from the troubleshooting manual, grounded in retrieved procedures"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the LLM to write a synthetic troubleshooting manual
    GenerateManual {
        /// Output path (defaults to ingest.manual_path)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Device the manual is written for
        #[arg(long, default_value = "Orbit-5G Base Station")]
        device: String,

        /// Operating system running on the device
        #[arg(long, default_value = "NebulaOS")]
        os: String,
    },

    /// Chunk the manual and rebuild the vector index
    Ingest {
        /// Manual to ingest (defaults to ingest.manual_path)
        #[arg(long)]
        manual: Option<PathBuf>,
    },

    /// Answer a question from the indexed manual
    Ask {
        /// Error code or symptom, e.g. "HW-1002 not working"
        query: String,

        /// Also print the ungrounded baseline answer
        #[arg(long, default_value_t = false)]
        compare: bool,

        /// Print the result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Serve the HTTP API
    Serve {
        /// Port to bind (defaults to server.port)
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    noc_oracle::core::logging::init(&paths);

    let state = AppState::initialize_with_paths(paths)
        .await
        .context("Failed to initialize NOC-Oracle")?;

    match cli.command {
        Command::GenerateManual { output, device, os } => {
            let path = output.unwrap_or_else(|| state.manual_path());
            let spec = ManualSpec {
                device,
                os,
                ..ManualSpec::default()
            };
            println!("Generating manual with {}... this may take a few seconds.", state.llm.model());
            state
                .manual_generator()
                .generate_to(&spec, &path)
                .await
                .context("Manual generation failed")?;
            println!("Success! Manual saved to: {}", path.display());
        }
        Command::Ingest { manual } => {
            let path = manual.unwrap_or_else(|| state.manual_path());
            let report = state
                .ingestor
                .ingest_file(&path)
                .await
                .context("Ingestion failed")?;
            println!("Ingested {} chunks from {}", report.chunks, report.source);
            if let Some(preview) = report.preview {
                println!("Example enriched chunk: {}...", preview);
            }
        }
        Command::Ask {
            query,
            compare,
            json,
        } => {
            let comparison = state.oracle.compare(&query, compare).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                print_solution(&comparison.grounded);
                if let Some(baseline) = comparison.baseline {
                    println!("\n--- Baseline (no manual context) ---");
                    println!("{}", baseline.trim());
                }
            }
        }
        Command::Serve { port } => {
            serve(state, port).await?;
        }
    }

    Ok(())
}

fn print_solution(solution: &Solution) {
    println!("--- Ranked chunks ---");
    if solution.sources.is_empty() {
        println!("No documents found.");
    }
    for (i, chunk) in solution.sources.iter().enumerate() {
        println!(
            "Rank #{} | Code: {} | Section: {}",
            i + 1,
            chunk.header(ERROR_CODE).unwrap_or("Unknown"),
            chunk.header(CATEGORY).unwrap_or("Unknown")
        );
    }

    println!("\n--- Answer ---");
    println!("{}", solution.answer.trim());
}

async fn serve(state: Arc<AppState>, port: Option<u16>) -> Result<()> {
    let server_settings = &state.settings.server;
    let bind_addr = format!(
        "{}:{}",
        server_settings.host,
        port.unwrap_or(server_settings.port)
    );

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

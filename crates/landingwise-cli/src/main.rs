//! LandingWise CLI
//!
//! Runs the HTTP API or a single generation from the terminal.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use landingwise_server::{create_router, AppState, ProjectStore};
use landingwise_workflow::{
    Config, GenerationContext, GenerationRequest, GenerationResult, LandingPageGenerator,
    OpenRouterClient, RunOptions, Style,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// LandingWise - AI landing page generator
///
/// Generates waitlist landing pages with an LLM, validating each draft and
/// asking for corrections until it passes.
#[derive(Parser, Debug)]
#[command(name = "landingwise")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: landingwise.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Store snapshot file (overrides server.stateFile)
        #[arg(long, value_name = "PATH")]
        state_file: Option<String>,
    },

    /// Generate one landing page and print it
    Generate {
        /// What the page should be about
        #[arg(value_name = "PROMPT")]
        prompt: String,

        /// Design style: modern, minimal, corporate or creative
        #[arg(short, long)]
        style: Option<Style>,

        /// Existing HTML file to refine instead of starting fresh
        #[arg(long, value_name = "FILE")]
        current: Option<PathBuf>,

        /// Write the HTML here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    let outcome = match args.command {
        Command::Serve { port, state_file } => {
            serve(args.config.as_deref(), port, state_file).await
        }
        Command::Generate {
            prompt,
            style,
            current,
            output,
        } => generate(args.config.as_deref(), prompt, style, current, output).await,
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Runs the HTTP API until Ctrl+C.
async fn serve(
    config_path: Option<&str>,
    port: Option<u16>,
    state_file: Option<String>,
) -> anyhow::Result<bool> {
    let mut config = load_config(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(state_file) = state_file {
        config.server.state_file = state_file;
    }
    config.validate()?;
    print_config(&config);

    let client = OpenRouterClient::from_env(&config.generation)?;
    let store = ProjectStore::open(&config.server.state_file)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "{e}\n\nSuggestion: Fix or remove '{}' to start with an empty store",
                config.server.state_file
            )
        })?;

    let addr: SocketAddr = ([0, 0, 0, 0], config.server.port).into();
    let state = AppState::new(config, store, Arc::new(client));
    let shutdown = state.shutdown.clone();
    let router = create_router(state);

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!("LandingWise API running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C, shutting down");
            }
            shutdown.cancel();
        })
        .await?;

    println!("Server stopped");
    Ok(true)
}

/// Runs one generation and writes the HTML.
///
/// Returns `Ok(false)` when the run did not produce a valid page.
async fn generate(
    config_path: Option<&str>,
    prompt: String,
    style: Option<Style>,
    current: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<bool> {
    let config = load_config(config_path)?;
    config.validate()?;

    let style = style.unwrap_or(config.server.default_style);
    let mut context = GenerationContext::new(prompt).with_style(style);
    if let Some(path) = &current {
        let html = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read current page '{}': {e}", path.display())
        })?;
        context = context.with_current_content(html);
    }

    let client = OpenRouterClient::from_env(&config.generation)?;
    let generator = LandingPageGenerator::new(Arc::new(client), config.workflow.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling generation");
            on_interrupt.cancel();
        }
    });

    eprintln!("Generating {style} landing page...");
    let result = generator
        .run(
            GenerationRequest::Compose(context),
            RunOptions::new("cli").with_cancel(cancel),
        )
        .await;

    print_summary(&result);
    write_html(&result.html, output.as_deref())?;
    Ok(result.success)
}

// ============================================================================
// Helpers
// ============================================================================

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Model: {}", config.generation.model);
    println!("  Max iterations: {}", config.workflow.max_iterations);
    println!("  Run timeout: {}s", config.workflow.run_timeout_secs);
    println!("  Default style: {}", config.server.default_style);
    println!("  Store: {}", config.server.state_file);
}

/// Prints the run outcome to stderr so stdout stays pure HTML.
fn print_summary(result: &GenerationResult) {
    eprintln!();
    eprintln!("=== Generation Summary ===");
    eprintln!("Success: {}", result.success);
    eprintln!("Iterations: {}", result.iterations);
    if !result.errors.is_empty() {
        eprintln!("Errors:");
        for error in &result.errors {
            eprintln!("  - {error}");
        }
    }
}

fn write_html(html: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, html)
                .map_err(|e| anyhow::anyhow!("Failed to write '{}': {e}", path.display()))?;
            eprintln!("HTML written to {}", path.display());
        }
        None => println!("{html}"),
    }
    Ok(())
}

//! llm-router command line entry point

use clap::{Parser, Subcommand};
use llm_router::config::RouterConfig;
use llm_router::observability::{init_default_logging, metrics};
use llm_router::router::policy::ASK_QUESTION_REQUEST_TYPE;
use llm_router::router::{LlmRequest, Router};
use llm_router::HttpTransport;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{debug, error, info};

/// Multi-provider LLM router with quota-aware fallback
#[derive(Parser)]
#[command(name = "llm-router")]
#[command(about = "Route prompts across LLM providers with retry and fallback")]
#[command(version)]
struct Cli {
    /// Configuration file path (built-in configuration when omitted)
    #[arg(short, long, value_name = "FILE", env = "LLM_ROUTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt through the router and print the answer
    Ask {
        #[arg(long, default_value = ASK_QUESTION_REQUEST_TYPE)]
        request_type: String,
        /// Profile context placed before the primary context
        #[arg(long)]
        profile: Option<String>,
        /// Explicit question appended last
        #[arg(long)]
        question: Option<String>,
        /// Model to try first instead of the request type's default
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        max_retries: Option<u32>,
        /// Per-attempt timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        primary_context: String,
    },
    /// Show which models a request would try, without calling any
    Resolve {
        #[arg(long, default_value = ASK_QUESTION_REQUEST_TYPE)]
        request_type: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// List registered models
    Models,
    /// Probe a model and every model of its fallback chain
    Health {
        #[arg(long)]
        model: Option<String>,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Config { show } => handle_config_command(&config, show),
        command => match Router::from_config(&config) {
            Ok(router) => run_command(&router, command).await,
            Err(e) => Err(e.into()),
        },
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<RouterConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(RouterConfig::load_from_file(path)?)
        }
        None => {
            debug!("Using built-in configuration");
            Ok(RouterConfig::builtin()?)
        }
    }
}

/// Run a router command; `Ok(false)` means the command ran but did not succeed
async fn run_command(
    router: &Router,
    command: Commands,
) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Commands::Ask {
            request_type,
            profile,
            question,
            model,
            temperature,
            max_tokens,
            max_retries,
            timeout,
            primary_context,
        } => {
            let request = LlmRequest {
                request_type,
                primary_context,
                profile_context: profile,
                question,
                model_override: model,
                temperature,
                max_tokens,
                max_retries,
                timeout: timeout.map(Duration::from_secs),
                ..Default::default()
            };

            let transport = HttpTransport::new()?;
            let result = router.answer_with_fallback(&transport, &request).await;
            debug!(
                "Router metrics: {}",
                serde_json::to_string(&metrics().snapshot())?
            );

            match (&result.content, &result.model_used) {
                (Some(content), Some(model)) => {
                    info!(model = %model, "Answer received");
                    println!("{content}");
                    Ok(true)
                }
                _ => {
                    eprintln!("No model produced a valid response, please try again.");
                    Ok(false)
                }
            }
        }
        Commands::Resolve {
            request_type,
            model,
        } => {
            let primary = model.unwrap_or_else(|| router.default_model_for(&request_type));
            println!("request type: {request_type}");
            println!("primary:      {primary}");
            for (position, fallback) in router.fallback_models(&primary).iter().enumerate() {
                let marker = if router.registry().contains(fallback) {
                    ""
                } else {
                    " (not registered)"
                };
                println!("fallback {}:   {fallback}{marker}", position + 1);
            }
            Ok(true)
        }
        Commands::Models => {
            if router.registry().is_empty() {
                println!("No models registered; check provider API key environment variables.");
            }
            for entry in router.registry().entries() {
                println!(
                    "{:<45} {:<12} context={:<8} max_output={}",
                    entry.model_id,
                    entry.provider,
                    entry.info.context_window,
                    entry.info.max_output_tokens
                );
            }
            Ok(true)
        }
        Commands::Health { model } => {
            let model =
                model.unwrap_or_else(|| router.engine_settings().universal_default_model.clone());
            let transport = HttpTransport::new()?;
            let results = router.probe_chain(&transport, &model).await;

            for probe in &results {
                println!("{}", serde_json::to_string(probe)?);
            }
            Ok(results.iter().any(|probe| probe.is_healthy()))
        }
        Commands::Config { .. } => Ok(true),
    }
}

fn handle_config_command(
    config: &RouterConfig,
    show: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    config.validate()?;
    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(true)
}

//! streambridge binary entry point.

use std::sync::Arc;

use clap::Parser;
use streambridge::agent::ToolLoopAgent;
use streambridge::cli::{Cli, Commands, ServeArgs, ServeMode};
use streambridge::config::BridgeConfig;
use streambridge::provider::{CompletionSource, OpenAiCompatibleSource};
use streambridge::server::{self, AgentState, CompletionState};
use streambridge::tools::{color_to_hex_tool, ToolRegistry};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streambridge=info,tower_http=info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => handle_serve(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_serve(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = BridgeConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    if config.api_key.is_none() {
        tracing::warn!("no API key configured; upstream requests will fail until one is set");
    }
    tracing::info!(mode = %args.mode, model = %config.model, base_url = %config.base_url, "starting streambridge");

    let source: Arc<dyn CompletionSource> = Arc::new(OpenAiCompatibleSource::from_config(&config));
    let app = match args.mode {
        ServeMode::Completion => {
            server::build_completion_router(CompletionState { source }, &config)
        }
        ServeMode::Agent => {
            let agent = ToolLoopAgent::builder()
                .source(source)
                .tools(ToolRegistry::new().with(color_to_hex_tool()))
                .system_prompt(config.system_prompt.clone())
                .max_steps(config.max_steps)
                .build();
            let state = AgentState {
                agent: Arc::new(agent),
                system_prompt: Some(config.system_prompt.clone()),
            };
            server::build_agent_router(state, &config)
        }
    };

    server::serve(app, &config.bind_addr()).await?;
    Ok(())
}

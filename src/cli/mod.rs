//! Command-line interface for the streambridge server.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use strum::{Display, EnumString};

use crate::config::BridgeConfig;

/// Streaming bridge from chat models and agents to AG-UI and AI SDK clients
#[derive(Parser, Debug)]
#[command(name = "streambridge", version, about = "Streaming bridge for AG-UI and AI SDK frontends")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an HTTP server
    Serve(ServeArgs),
}

/// Which endpoints the server mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ServeMode {
    /// Raw completion chunks as AG-UI events on `POST /`
    Completion,
    /// Tool-calling agent: AG-UI on `POST /`, AI SDK UI stream on `POST /chat`
    Agent,
}

/// Arguments for `streambridge serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Server mode
    #[arg(value_enum)]
    pub mode: ServeMode,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Model name sent to the upstream API
    #[arg(short, long)]
    pub model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Allowed CORS origin (repeatable, `*` for any)
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// System prompt for the agent
    #[arg(short, long)]
    pub system: Option<String>,
}

impl ServeArgs {
    /// Apply flags on top of an already layered config.
    pub fn apply_to(&self, config: &mut BridgeConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if !self.cors_origins.is_empty() {
            config.cors_origins = self.cors_origins.clone();
        }
        if let Some(system) = &self.system {
            config.system_prompt = system.clone();
        }
    }
}

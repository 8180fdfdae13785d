//! conduit-mcp: reference MCP server over stdio
//!
//! Serves a small built-in diagnostic capability set (echo/add tools, a
//! status resource, a greeting prompt) through the protocol engine, for
//! exercising MCP clients end to end.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use conduit_mcp::config;
use conduit_mcp::mcp::handler::{McpHandler, ServerInfo};
use conduit_mcp::mcp::server::McpServer;
use conduit_mcp::provider::{
    CapabilityProvider, Prompt, PromptArgument, PromptMessage, Resource, ResourceContent,
    ResourceTemplate, Tool,
};

/// Reference MCP server for the conduit protocol engine.
///
/// Exposes a built-in diagnostic capability set over stdio so MCP clients
/// can be exercised end to end without external dependencies.
#[derive(Parser, Debug)]
#[command(name = "conduit-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the built-in diagnostic capability set.
fn diagnostic_provider(
    policy: conduit_mcp::provider::DuplicatePolicy,
) -> Result<CapabilityProvider, conduit_mcp::error::Error> {
    let mut provider = CapabilityProvider::with_policy("diagnostics", policy);

    provider.add_tool(
        Tool::new(
            "echo",
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Text to echo back"}
                },
                "required": ["text"]
            }),
            |args| {
                Ok(json!({
                    "content": [{"type": "text", "text": args["text"].as_str().unwrap_or("")}]
                }))
            },
        )
        .with_description("Echo the given text back unchanged."),
    )?;

    provider.add_tool(
        Tool::new(
            "add",
            json!({
                "type": "object",
                "properties": {
                    "a": {"type": "number"},
                    "b": {"type": "number"}
                },
                "required": ["a", "b"]
            }),
            |args| {
                let a = args["a"].as_f64().unwrap_or(0.0);
                let b = args["b"].as_f64().unwrap_or(0.0);
                Ok(json!({
                    "content": [{"type": "text", "text": format!("{}", a + b)}],
                    "structuredContent": {"result": a + b},
                }))
            },
        )
        .with_description("Add two numbers, returning a structured result.")
        .with_output_schema(json!({
            "type": "object",
            "properties": {"result": {"type": "number"}},
            "required": ["result"]
        })),
    )?;

    provider.add_resource(
        Resource::new("status://server", "server-status", |_| {
            Ok(ResourceContent::Text {
                text: json!({
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                })
                .to_string(),
                mime_type: Some("application/json".to_string()),
            })
        })
        .with_description("Engine name and version.")
        .with_mime_type("application/json"),
    )?;

    provider.add_resource_template(
        ResourceTemplate::new("echo://{message*}", "echo-message", |params| {
            Ok(ResourceContent::text(
                params["message"].as_str().unwrap_or("").to_string(),
            ))
        })?
        .with_description("Echoes the URI path back as text."),
    )?;

    provider.add_prompt(
        Prompt::new("greet", |args| {
            let name = args["name"].as_str().unwrap_or("world").to_string();
            Ok(vec![PromptMessage::user(format!(
                "Please write a short, friendly greeting for {name}."
            ))])
        })
        .with_description("Generate a short greeting.")
        .with_arguments(vec![
            PromptArgument::required("name").with_description("Who to greet")
        ]),
    )?;

    Ok(provider)
}

/// Entry point for the conduit-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration (defaults apply when no file exists)
    let config_path = args.config.as_deref();
    let cfg = match config::load_config_or_default(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nExpected config at: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "conduit-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting conduit-mcp server"
    );

    let provider = match diagnostic_provider(cfg.dispatch.policy()) {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = %e, "Failed to build capability provider");
            return ExitCode::FAILURE;
        }
    };

    let info = ServerInfo {
        name: cfg.server.name.clone(),
        version: cfg
            .server
            .version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        website_url: cfg.server.website_url.clone(),
        icons: None,
    };

    let mut handler = McpHandler::new(provider, info);
    if !cfg.dispatch.dereference_schemas {
        handler = handler.with_raw_schemas();
    }
    if let Some(instructions) = &cfg.server.instructions {
        handler = handler.with_instructions(instructions.clone());
    }

    let mut server = McpServer::new(handler);

    info!("MCP server ready, waiting for client connection...");

    // Run the server
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(server.run());

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

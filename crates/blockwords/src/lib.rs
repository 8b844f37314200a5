//! # BlockWords - Session Service Entry Point
//!
//! Connects the letter cubes on an MQTT broker to the
//! [`cube_session::SessionCoordinator`]. This crate handles CLI parsing,
//! configuration loading, logging, the MQTT transport and the dispatch task;
//! all session rules live in `cube_session`.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! blockwords
//!
//! # Specify custom configuration
//! blockwords --config studio.toml
//!
//! # Override the broker and start a session right away
//! blockwords --broker 192.168.1.20 --port 1883 --start
//!
//! # JSON logging for production
//! blockwords --json-logs
//! ```
//!
//! ## Configuration
//!
//! The service loads configuration from a TOML file (default:
//! `blockwords.toml`). If the file doesn't exist, a default configuration
//! is written there.
//!
//! ## Signal Handling
//!
//! The service shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM: dispatch
//! stops, queued cube updates are flushed, then the client disconnects.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod mqtt;
mod runtime;
mod signals;

use app::Application;
use cli::CliArgs;

/// Main entry point for the BlockWords service.
///
/// Handles the complete application lifecycle:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut log_settings = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default()
        .logging;
    if let Some(level) = &args.log_level {
        log_settings.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&log_settings, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{AppConfig, BrokerSettings, LoggingSettings, RuntimeSettings, WordSettings};
pub use mqtt::MqttTransport;
pub use runtime::{spawn_pipeline, Pipeline, SessionRuntime};

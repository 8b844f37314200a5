//! Main application logic and lifecycle management.
//!
//! The `Application` loads configuration, builds the coordinator and its
//! collaborators, wires the MQTT transport to the dispatch pipeline and
//! runs until a shutdown signal arrives.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    mqtt::{drive_event_loop, MqttTransport},
    runtime::spawn_pipeline,
    signals::{setup_signal_handlers, wait_for_signal},
};
use cube_session::{
    create_coordinator_with, GuessJudge, LetterPool, RandomLetterPool, SessionCoordinator,
    SessionEvent, ShutdownState, WordListJudge,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn};

/// How long the publisher gets to flush the outbound queue on shutdown.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Main application struct.
pub struct Application {
    config: AppConfig,
    force_start: bool,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(host) = args.broker_host {
            config.broker.host = host;
        }
        if let Some(port) = args.broker_port {
            config.broker.port = port;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        Ok(Self {
            config,
            force_start: args.force_start,
        })
    }

    /// Builds the coordinator with the configured letter pool and judge.
    fn build_coordinator(&self) -> Result<SessionCoordinator, Box<dyn std::error::Error>> {
        let pool: Box<dyn LetterPool> = match self.config.words.seed {
            Some(seed) => Box::new(RandomLetterPool::seeded(seed)),
            None => Box::new(RandomLetterPool::new()),
        };
        let judge: Box<dyn GuessJudge> = match &self.config.words.word_list {
            Some(path) => Box::new(WordListJudge::load(path)?),
            None => {
                warn!("📚 No word list configured, every guess will be judged bad");
                Box::new(WordListJudge::default())
            }
        };

        let coordinator = create_coordinator_with(self.config.session.clone(), pool, judge)?
            .with_params(self.config.game.clone());
        Ok(coordinator)
    }

    /// Runs the service until a shutdown signal arrives.
    ///
    /// # Shutdown
    ///
    /// 1. First signal stops inbound dispatch
    /// 2. The publisher flushes whatever is queued and marks shutdown
    ///    complete
    /// 3. The client disconnects and the event loop is stopped
    ///
    /// A second signal exits immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting BlockWords session service");
        self.log_configuration_summary();

        let coordinator = self.build_coordinator()?;
        let shutdown = ShutdownState::new();

        let (transport, eventloop) = MqttTransport::connect(&self.config.broker);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (reconnect_tx, reconnect_rx) = watch::channel(0u64);
        let event_loop = tokio::spawn(drive_event_loop(
            eventloop,
            transport.clone(),
            inbound_tx,
            reconnect_tx,
            Duration::from_millis(self.config.broker.reconnect_delay_ms),
        ));

        let pipeline = spawn_pipeline(
            coordinator,
            Arc::new(transport.clone()),
            inbound_rx,
            Some(reconnect_rx),
            &self.config.runtime,
            self.config.broker.channel_capacity,
            self.force_start,
            shutdown.clone(),
        );
        let event_log = tokio::spawn(log_events(pipeline.events.subscribe()));

        info!("✅ BlockWords is now running!");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        setup_signal_handlers(&shutdown).await?;

        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("📡 Phase 1: Stopping dispatch...");
        if let Err(e) = pipeline.dispatcher.await {
            error!("❌ Dispatch task failed: {:?}", e);
        }

        info!("⏳ Phase 2: Flushing outbound messages...");
        match tokio::time::timeout(FLUSH_TIMEOUT, pipeline.publisher).await {
            Ok(Ok(stats)) => info!("✅ Flushed, {} message(s) sent in total", stats.sent),
            Ok(Err(e)) => error!("❌ Publisher task failed: {:?}", e),
            Err(_) => warn!("⏰ Timeout reached, some messages may not have been sent"),
        }

        info!("🧹 Phase 3: Disconnecting from broker...");
        transport.disconnect().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        event_loop.abort();
        event_log.abort();

        info!("✅ BlockWords shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        let session = &self.config.session;
        info!("📋 Configuration Summary:");
        info!(
            "  🌐 Broker: {}:{} as '{}'",
            self.config.broker.host, self.config.broker.port, self.config.broker.client_id
        );
        for station in &session.stations {
            info!("  🧊 {}: cubes {:?}", station.id, station.devices);
        }
        info!(
            "  ⏱️ Countdown: {} ms x 6 stages{}",
            session.countdown_stage_ms,
            if session.designated_prompts {
                " (designated prompts)"
            } else {
                ""
            }
        );
        info!("  🔁 Letter rebroadcast every {}s", session.rebroadcast_s);
    }
}

/// Logs session events as JSON lines until the channel closes.
async fn log_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!(target: "blockwords::events", "{}", json),
                Err(e) => warn!("⚠️ Could not encode session event: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("⚠️ Event log fell behind, {} event(s) skipped", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

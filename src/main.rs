//! lamco-hid-pipeline - HID event pipeline replay
//!
//! Replays recorded raw HID values through the pipeline: reordering,
//! grabbable-state tracking and paced output with identity remapping.
//! Every posted report is printed to stdout as one JSON line.

use std::fs::File;
use std::io::BufReader;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lamco_hid_pipeline::clock::MonotonicClock;
use lamco_hid_pipeline::config::Config;
use lamco_hid_pipeline::event_queue::EventQueue;
use lamco_hid_pipeline::grabbable::{
    spawn_notification_task, GrabbableStateEvent, GrabbableStateQueuesManager,
};
use lamco_hid_pipeline::output::{OutputContext, OutputEventQueue};
use lamco_hid_pipeline::replay::{push_raw_values, read_raw_values, IdentityRemapper, JsonLinesSink};

/// Command-line arguments for lamco-hid-pipeline
#[derive(Parser, Debug)]
#[command(name = "lamco-hid-pipeline")]
#[command(version, about = "Replay raw HID values through the event pipeline", long_about = None)]
pub struct Args {
    /// Recorded raw values (JSON lines); reads stdin when omitted
    pub input: Option<String>,

    /// Configuration file path
    #[arg(
        short,
        long,
        env = "LAMCO_HID_CONFIG",
        default_value = "/etc/lamco-hid-pipeline/config.toml"
    )]
    pub config: String,

    /// Record the first grabbed event time stamp for every device after loading
    #[arg(long)]
    pub grab: bool,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration before logging so its level can apply
    let config = Config::load(&args.config);

    init_logging(&args, config.as_ref().map(|c| c.logging.level.as_str()).unwrap_or("info"))?;

    info!("════════════════════════════════════════════════════════");
    info!("  lamco-hid-pipeline v{}", env!("CARGO_PKG_VERSION"));
    info!("  Built: {} {}", env!("BUILD_DATE"), env!("BUILD_TIME"));
    info!("  Commit: {}", env!("GIT_HASH"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    let config = config.unwrap_or_else(|e| {
        warn!("Failed to load config: {:#}, using defaults", e);
        Config::default()
    });
    debug!("Config: {:?}", config);

    let values = match &args.input {
        Some(path) => {
            let file = File::open(path).context(format!("Failed to open input: {}", path))?;
            read_raw_values(BufReader::new(file))?
        }
        None => read_raw_values(std::io::stdin().lock())?,
    };
    info!("Loaded {} raw values", values.len());

    // Reorder
    let mut event_queue = EventQueue::new();
    let recognized = push_raw_values(&mut event_queue, &values);
    info!("{} of {} values recognized", recognized, values.len());

    // Grabbable state
    let (manager, notifications) =
        GrabbableStateQueuesManager::with_history_limit(config.grabbable.history_limit);
    let notification_task = spawn_notification_task(notifications, |event| match event {
        GrabbableStateEvent::Changed { device_id, state: Some(state) } => {
            info!("Grabbable state of {}: {}", device_id, state)
        }
        GrabbableStateEvent::Changed { device_id, state: None } => {
            info!("Grabbable state of {} cleared", device_id)
        }
        GrabbableStateEvent::FirstGrabbedEventRecorded { device_id, time_stamp } => {
            info!("First grabbed event of {} at {}", device_id, time_stamp)
        }
    });

    manager.update(&event_queue);
    if args.grab && !manager.update_first_grabbed_event_time_stamp(&event_queue) {
        warn!("No first grabbed event time stamp was recorded");
    }

    // Output
    let start = event_queue.front().map(|e| e.time_stamp()).unwrap_or_default();
    let output_queue = OutputEventQueue::with_settings(&config.to_output_settings());
    let context = OutputContext::spawn(
        output_queue,
        JsonLinesSink::new(std::io::stdout()),
        MonotonicClock::starting_at(start),
    );

    let mut events = Vec::with_capacity(event_queue.len());
    while let Some(event) = event_queue.erase_front_event() {
        events.push(event);
    }

    context
        .with_queue(move |state| {
            let mut remapper = IdentityRemapper::new();
            for event in &events {
                remapper.remap(event, state);
            }
        })
        .await?;

    // Wait for the paced output to drain
    while !context.with_queue(|state| state.queue.is_empty()).await? {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    context.shutdown().await;

    manager.clear();
    drop(manager);
    if let Err(e) = notification_task.await {
        warn!("Notification task failed: {}", e);
    }

    info!("Replay finished");
    Ok(())
}

fn init_logging(args: &Args, config_level: &str) -> Result<()> {
    let log_level = match args.verbose {
        0 => config_level,
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("lamco={level},warn", level = log_level))
    });

    // Reports go to stdout, so logs go to stderr
    if let Some(log_file_path) = &args.log_file {
        let file = File::create(log_file_path)?;

        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path);
    } else {
        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
        }
    }

    Ok(())
}

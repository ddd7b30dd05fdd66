//! Hand Raiser.
//!
//! Usage:
//!   cargo run -- --source console
//!   cargo run -- --source mqtt --servo mqtt
//!   cargo run -- --source simulation --debug

use clap::{Parser, ValueEnum};
use hand_raiser::actuator::{MqttServo, Servo, SimulatedServo};
use hand_raiser::config::{Config, load_dotenv};
use hand_raiser::coordinator::HandCoordinator;
use hand_raiser::input::console::run_console_source;
use hand_raiser::input::mqtt::{MqttClient, MqttHandSource};
use hand_raiser::input::simulation::run_hand_simulation;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Where hand signals come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// Lines typed on stdin
    Console,
    /// Messages on the hand-count MQTT topic
    Mqtt,
    /// A built-in cycle of counts
    Simulation,
}

/// Which servo driver moves the hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ServoKind {
    /// Log moves only
    Simulated,
    /// Publish positions to the servo MQTT topic
    Mqtt,
}

#[derive(Parser)]
#[command(name = "hand-raiser")]
#[command(about = "Raise a robot hand while meeting participants have their hands raised")]
struct Cli {
    /// Turn on debugging logs
    #[arg(long)]
    debug: bool,

    /// Source of hand signals
    #[arg(long, value_enum, env = "HAND_SOURCE", default_value = "console")]
    source: Source,

    /// Servo driver
    #[arg(long, value_enum, env = "HAND_SERVO", default_value = "simulated")]
    servo: ServoKind,

    /// Seconds between simulated count changes
    #[arg(long, default_value_t = 8)]
    sim_step_secs: u64,
}

fn init_logger(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_dotenv();
    let cli = Cli::parse();
    init_logger(cli.debug);

    info!("Starting Hand Raiser");

    let config = Config::from_env();
    info!("Configuration loaded:");
    info!("  Source: {:?}", cli.source);
    info!("  Servo: {:?}", cli.servo);
    info!(
        "  Positions: lowered={} raised={} wiggle=+{}",
        config.hand.lowered_position, config.hand.raised_position, config.hand.wiggle_offset
    );
    info!("  Inactivity period: {}s", config.hand.inactivity_secs);

    // One MQTT connection serves both the hand source and the servo
    let needs_mqtt = cli.source == Source::Mqtt || cli.servo == ServoKind::Mqtt;
    let mqtt_client = needs_mqtt.then(|| {
        info!(
            "  MQTT broker: {}:{}",
            config.mqtt.broker_host, config.mqtt.broker_port
        );
        MqttClient::new(&config.mqtt)
    });
    let async_client = mqtt_client.as_ref().map(|client| client.client());

    let servo: Box<dyn Servo> = match (cli.servo, &async_client) {
        (ServoKind::Mqtt, Some(client)) => Box::new(MqttServo::new(client.clone(), &config.servo)),
        _ => Box::new(SimulatedServo::new(Duration::from_millis(200))),
    };
    let coordinator = Arc::new(HandCoordinator::new(servo, config.hand.clone()));

    // Start the event loop before anything publishes
    let mut mqtt_source = None;
    let mqtt_loop = mqtt_client.map(|client| {
        let (connected_tx, connected_rx) = oneshot::channel();
        let msg_tx = if cli.source == Source::Mqtt {
            let (msg_tx, msg_rx) = mpsc::channel(64);
            mqtt_source = Some((msg_rx, connected_rx));
            Some(msg_tx)
        } else {
            None
        };
        tokio::spawn(client.run(msg_tx, Some(connected_tx)))
    });

    if let Err(e) = coordinator.start().await {
        error!("Failed to home the hand: {}", e);
        std::process::exit(1);
    }

    let mut source_task: JoinHandle<()> = match cli.source {
        Source::Console => run_console_source(coordinator.clone()),
        Source::Simulation => {
            run_hand_simulation(coordinator.clone(), Duration::from_secs(cli.sim_step_secs))
        }
        Source::Mqtt => match (mqtt_source, &async_client) {
            (Some((msg_rx, connected_rx)), Some(client)) => {
                MqttHandSource::new(config.mqtt.hand_count_topic.clone()).start(
                    client.clone(),
                    msg_rx,
                    connected_rx,
                    coordinator.clone(),
                )
            }
            _ => {
                error!("MQTT source requested without an MQTT connection");
                std::process::exit(1);
            }
        },
    };

    info!("Hand Raiser is running");
    info!("  - Press Ctrl+C to exit");

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        },
        result = &mut source_task => match result {
            Ok(()) => warn!("Hand signal source ended"),
            Err(e) => error!("Hand signal source failed: {}", e),
        },
    }
    source_task.abort();

    // Lower the hand before the servo connection goes away
    if let Err(e) = coordinator.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    // The MQTT servo disconnects on shutdown; otherwise nobody has yet
    if cli.servo != ServoKind::Mqtt
        && let Some(client) = &async_client
        && let Err(e) = client.disconnect().await
    {
        warn!("Failed to disconnect from MQTT broker: {}", e);
    }

    if let Some(mqtt_loop) = mqtt_loop {
        // Lets the queued disconnect reach the broker
        if tokio::time::timeout(Duration::from_secs(2), mqtt_loop)
            .await
            .is_err()
        {
            warn!("MQTT event loop did not stop in time");
        }
    }

    info!("Hand Raiser stopped");
    // A pending stdin read would otherwise keep the runtime alive
    std::process::exit(0);
}

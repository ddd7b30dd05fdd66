use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: We're single-threaded at this point (called before any async runtime)
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split `.env` content into key/value pairs, skipping blanks and comments.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key, value));
        }
    }

    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub hand: HandConfig,
    pub mqtt: MqttConfig,
    pub servo: ServoConfig,
}

/// Servo positions and wiggle timing for the robot hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandConfig {
    /// Servo position when the hand is up
    pub raised_position: u32,
    /// Servo position when the hand is down
    pub lowered_position: u32,
    /// How far past the raised position a wiggle swings
    pub wiggle_offset: u32,
    /// Number of swings per wiggle
    pub wiggle_repeats: u32,
    /// Pause after each wiggle move
    pub wiggle_hold_ms: u64,
    /// How long the hand stays raised before it wiggles
    pub inactivity_secs: u64,
}

impl HandConfig {
    pub fn wiggle_hold(&self) -> Duration {
        Duration::from_millis(self.wiggle_hold_ms)
    }

    pub fn inactivity_period(&self) -> Duration {
        Duration::from_secs(self.inactivity_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic carrying hand signals (`raise`, `lower`, a count, or `{"count": n}`)
    pub hand_count_topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServoConfig {
    /// Topic the servo listens on for `{"position": n}` commands
    pub topic: String,
    pub move_timeout_ms: u64,
    /// Time the servo needs to physically reach a commanded position
    pub settle_ms: u64,
}

impl ServoConfig {
    pub fn move_timeout(&self) -> Duration {
        Duration::from_millis(self.move_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hand: HandConfig {
                raised_position: 30,
                lowered_position: 0,
                wiggle_offset: 5,
                wiggle_repeats: 3,
                wiggle_hold_ms: 300,
                inactivity_secs: 5,
            },
            mqtt: MqttConfig {
                broker_host: "localhost".to_string(),
                broker_port: 1883,
                client_id: "hand-raiser".to_string(),
                username: None,
                password: None,
                hand_count_topic: "hand-raiser/count".to_string(),
            },
            servo: ServoConfig {
                topic: "hand-raiser/servo/set".to_string(),
                move_timeout_ms: 2000,
                settle_ms: 250,
            },
        }
    }
}

/// Overwrite `target` with the parsed value of `key`, ignoring unparsable values.
fn parse_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring invalid value for {}: {:?}", key, raw),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Hand geometry and timing
        parse_env("HAND_RAISED_POSITION", &mut config.hand.raised_position);
        parse_env("HAND_LOWERED_POSITION", &mut config.hand.lowered_position);
        parse_env("HAND_WIGGLE_OFFSET", &mut config.hand.wiggle_offset);
        parse_env("HAND_WIGGLE_REPEATS", &mut config.hand.wiggle_repeats);
        parse_env("HAND_WIGGLE_HOLD_MS", &mut config.hand.wiggle_hold_ms);
        parse_env("HAND_INACTIVITY_SECS", &mut config.hand.inactivity_secs);

        // MQTT configuration
        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        parse_env("MQTT_BROKER_PORT", &mut config.mqtt.broker_port);
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Ok(topic) = std::env::var("HAND_COUNT_TOPIC") {
            config.mqtt.hand_count_topic = topic;
        }

        // Servo output
        if let Ok(topic) = std::env::var("SERVO_TOPIC") {
            config.servo.topic = topic;
        }
        parse_env("SERVO_MOVE_TIMEOUT_MS", &mut config.servo.move_timeout_ms);
        parse_env("SERVO_SETTLE_MS", &mut config.servo.settle_ms);

        config
    }
}

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum HandError {
    #[error("Servo move failed: {0}")]
    DeviceFault(String),

    #[error("No raised hands to lower")]
    NoRaisedHands,

    #[error("Raised hand count is already at its maximum")]
    CountOverflow,

    #[error("Invalid hand signal: {0}")]
    InvalidSignal(String),

    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HandError>;

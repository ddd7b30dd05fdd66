//! Actuator control for the robot hand.
//!
//! The [`ActuatorController`] owns the servo and tracks the pose it last
//! commanded. The idle wiggle that keeps a raised hand visible lives in
//! [`wiggle`].

mod mqtt_servo;
mod simulated;
#[cfg(test)]
pub(crate) mod testing;
pub mod wiggle;

pub use mqtt_servo::MqttServo;
pub use simulated::SimulatedServo;
pub use wiggle::{WiggleTask, run_idle_wiggle, wiggle_once};

use crate::config::HandConfig;
use crate::error::Result;
use async_trait::async_trait;
use log::{debug, warn};

/// Driver for the physical servo.
///
/// Implementations move the servo to an absolute position and only return
/// once the move has been acknowledged. Failures are reported as
/// [`HandError::DeviceFault`](crate::error::HandError::DeviceFault).
#[async_trait]
pub trait Servo: Send {
    /// Move the servo to an absolute position.
    async fn move_to(&mut self, position: u32) -> Result<()>;

    /// Release the connection to the servo.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Commanded pose of the hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorPosition {
    Lowered,
    Raised,
    /// Raised and swung past the raised position by the given offset
    Wiggled(u32),
}

/// Moves the hand between its poses.
///
/// Not synchronized on its own; callers share it behind a lock.
pub struct ActuatorController {
    servo: Box<dyn Servo>,
    config: HandConfig,
    position: ActuatorPosition,
}

impl ActuatorController {
    /// Create a controller. The hand is assumed lowered until the first move.
    pub fn new(servo: Box<dyn Servo>, config: HandConfig) -> Self {
        Self {
            servo,
            config,
            position: ActuatorPosition::Lowered,
        }
    }

    /// Pose of the last successful move.
    pub fn position(&self) -> ActuatorPosition {
        self.position
    }

    pub fn config(&self) -> &HandConfig {
        &self.config
    }

    /// Translate a pose into the servo's position units.
    pub fn servo_position(&self, position: ActuatorPosition) -> u32 {
        match position {
            ActuatorPosition::Lowered => self.config.lowered_position,
            ActuatorPosition::Raised => self.config.raised_position,
            ActuatorPosition::Wiggled(offset) => self.config.raised_position.saturating_add(offset),
        }
    }

    /// Move to `position` unconditionally.
    ///
    /// The tracked pose only changes once the servo acknowledges the move.
    pub async fn move_to(&mut self, position: ActuatorPosition) -> Result<()> {
        let value = self.servo_position(position);
        debug!("[Servo] Moving to {:?} ({})", position, value);
        self.servo.move_to(value).await?;
        self.position = position;
        Ok(())
    }

    /// Raise the hand. Raising an already-raised hand is a no-op.
    pub async fn raise(&mut self) -> Result<()> {
        if self.position == ActuatorPosition::Raised {
            warn!("[Servo] Ignoring raise: hand is already raised");
            return Ok(());
        }
        self.move_to(ActuatorPosition::Raised).await
    }

    /// Lower the hand. Lowering an already-lowered hand is a no-op.
    pub async fn lower(&mut self) -> Result<()> {
        if self.position == ActuatorPosition::Lowered {
            warn!("[Servo] Ignoring lower: hand is already lowered");
            return Ok(());
        }
        self.move_to(ActuatorPosition::Lowered).await
    }

    /// Poses visited by one wiggle, ending back at the raised position.
    pub fn wiggle_steps(&self) -> Vec<ActuatorPosition> {
        (0..self.config.wiggle_repeats)
            .flat_map(|_| {
                [
                    ActuatorPosition::Wiggled(self.config.wiggle_offset),
                    ActuatorPosition::Raised,
                ]
            })
            .collect()
    }

    /// Release the servo connection.
    pub async fn close(&mut self) -> Result<()> {
        self.servo.close().await
    }
}

impl AsMut<ActuatorController> for ActuatorController {
    fn as_mut(&mut self) -> &mut ActuatorController {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingServo;
    use super::*;
    use crate::config::Config;
    use crate::error::HandError;

    fn controller() -> (ActuatorController, RecordingServo) {
        let servo = RecordingServo::new();
        let controller = ActuatorController::new(Box::new(servo.clone()), Config::default().hand);
        (controller, servo)
    }

    #[tokio::test]
    async fn test_raise_and_lower_command_servo() {
        let (mut controller, servo) = controller();

        controller.raise().await.unwrap();
        assert_eq!(controller.position(), ActuatorPosition::Raised);

        controller.lower().await.unwrap();
        assert_eq!(controller.position(), ActuatorPosition::Lowered);

        assert_eq!(servo.moves(), vec![30, 0]);
    }

    #[tokio::test]
    async fn test_double_raise_is_noop() {
        let (mut controller, servo) = controller();

        controller.raise().await.unwrap();
        controller.raise().await.unwrap();

        assert_eq!(servo.moves(), vec![30]);
    }

    #[tokio::test]
    async fn test_lower_when_lowered_is_noop() {
        let (mut controller, servo) = controller();

        controller.lower().await.unwrap();

        assert!(servo.moves().is_empty());
    }

    #[tokio::test]
    async fn test_lower_from_wiggle_position() {
        let (mut controller, servo) = controller();

        controller.move_to(ActuatorPosition::Wiggled(5)).await.unwrap();
        controller.lower().await.unwrap();

        assert_eq!(servo.moves(), vec![35, 0]);
    }

    #[tokio::test]
    async fn test_failed_move_keeps_position() {
        let (mut controller, servo) = controller();
        servo.fail_moves(true);

        let result = controller.raise().await;

        assert!(matches!(result, Err(HandError::DeviceFault(_))));
        assert_eq!(controller.position(), ActuatorPosition::Lowered);
        assert!(servo.moves().is_empty());
    }

    #[test]
    fn test_wiggle_position_saturates() {
        let mut config = Config::default().hand;
        config.raised_position = u32::MAX - 2;
        let controller = ActuatorController::new(Box::new(RecordingServo::new()), config);

        assert_eq!(
            controller.servo_position(ActuatorPosition::Wiggled(5)),
            u32::MAX
        );
    }

    #[test]
    fn test_wiggle_steps() {
        let (controller, _servo) = controller();
        let steps = controller.wiggle_steps();

        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], ActuatorPosition::Wiggled(5));
        assert_eq!(steps[1], ActuatorPosition::Raised);
        assert_eq!(steps.last(), Some(&ActuatorPosition::Raised));

        let values: Vec<u32> = steps.iter().map(|s| controller.servo_position(*s)).collect();
        assert_eq!(values, vec![35, 30, 35, 30, 35, 30]);
    }
}

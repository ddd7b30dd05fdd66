//! Hand Raiser library.
//!
//! Mirrors the number of raised hands in a meeting onto a servo-driven robot
//! hand, and wiggles the hand while it stays raised.

pub mod actuator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod input;

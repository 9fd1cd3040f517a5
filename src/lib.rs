//! Core of the potentiometer-driven LED dimmer.
//!
//! Everything the control loop needs (configuration arithmetic, the
//! 10-bit sample and duty-cycle types, the three-state control machine and
//! the simulated register model it is tested against) lives here and is
//! target-independent. Only `hardware` touches the RP2350 registers.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod config;
pub mod dimmer_fsm;
pub mod sample;
pub mod sim;

#[cfg(target_os = "none")]
pub mod hardware;

//! `phasetune` - Adaptive traffic signal retiming driven by near-miss risk
//!
//! This library provides the near-miss detector, the phase-duration
//! optimizer, the observed-phase tracker and the control loop that ties
//! them to a simulation environment.

pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod observability;
pub mod optimizer;
pub mod output;
pub mod phase;
pub mod risk;
pub mod sim;

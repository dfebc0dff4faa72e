//! Chip-agnostic core logic for the Aerial FM tuner crates
//!
//! This crate contains everything that does not depend on a specific
//! tuner chip:
//!
//! - Broadcast band definitions and frequency clamping
//! - The [`traits::FmTuner`] hardware abstraction trait
//! - Shared tuner types (search direction/stop level, de-emphasis,
//!   decoded status)
//!
//! Frequencies are carried as integer kHz throughout; floating-point
//! MHz only appears at the public API edge.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod band;
pub mod traits;

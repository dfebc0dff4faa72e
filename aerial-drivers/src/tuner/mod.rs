//! Tuner chip drivers

pub mod tea5767;

pub use tea5767::{Error, StatusFrame, Tea5767, TunerState};

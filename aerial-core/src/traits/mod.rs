//! Hardware abstraction traits
//!
//! These traits define the interface between application logic and
//! chip-specific tuner drivers.

pub mod tuner;

pub use tuner::{
    DeEmphasis, FmTuner, SearchDirection, SearchStopLevel, SignalLevel, TunerStatus,
};

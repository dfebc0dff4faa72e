//! FM tuner driver trait
//!
//! This trait abstracts over FM receiver chips that tune by frequency
//! and can search the band on their own (TEA5767, SI4703, KT0913, etc.)

use crate::band::Band;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction for a station search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchDirection {
    /// Search towards the upper band limit
    #[default]
    Up,
    /// Search towards the lower band limit
    Down,
}

impl SearchDirection {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            SearchDirection::Up => SearchDirection::Down,
            SearchDirection::Down => SearchDirection::Up,
        }
    }
}

/// Signal level at which an automatic search stops
///
/// The levels correspond to the chip's internal ADC thresholds: a
/// search only latches onto a station whose level reading reaches the
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchStopLevel {
    /// Stop on weak stations (ADC level 5)
    Low,
    /// Stop on usable stations (ADC level 7)
    #[default]
    Mid,
    /// Stop on strong stations only (ADC level 10)
    High,
}

impl SearchStopLevel {
    /// The ADC level reading a station must reach for the search to stop
    pub fn adc_threshold(self) -> u8 {
        match self {
            SearchStopLevel::Low => 5,
            SearchStopLevel::Mid => 7,
            SearchStopLevel::High => 10,
        }
    }
}

/// Audio de-emphasis time constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeEmphasis {
    /// 50 microseconds (Europe)
    #[default]
    Us50,
    /// 75 microseconds (US, Japan)
    Us75,
}

/// Received signal level
///
/// A 4-bit ADC reading, 0 (no signal) to 15 (strongest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SignalLevel(pub u8);

impl SignalLevel {
    /// Raw ADC reading
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Whether the level reaches the given search stop threshold
    pub fn reaches(self, stop: SearchStopLevel) -> bool {
        self.0 >= stop.adc_threshold()
    }
}

/// Decoded tuner status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TunerStatus {
    /// Tuning or search operation has settled
    pub ready: bool,
    /// A search ran into the band limit without finding a station
    pub band_limit: bool,
    /// A stereo transmission is being received
    pub stereo: bool,
    /// Received signal level
    pub signal: SignalLevel,
    /// Currently tuned frequency in kHz
    pub frequency_khz: u32,
    /// Intermediate-frequency counter reading, useful as a tuning
    /// quality indicator
    pub if_counter: u8,
}

/// Convert MHz to the integer kHz used internally
///
/// Rounds to the nearest kHz.
pub fn mhz_to_khz(mhz: f32) -> u32 {
    (mhz * 1000.0 + 0.5) as u32
}

/// Convert integer kHz to MHz for display
pub fn khz_to_mhz(khz: u32) -> f32 {
    khz as f32 / 1000.0
}

/// Trait for FM tuner chips
///
/// Implementations keep a shadow of the chip's control registers and
/// rewrite them on every mutation, so each method maps to at most one
/// bus transaction.
pub trait FmTuner {
    /// Driver error type
    type Error;

    /// The broadcast band the tuner is bound to
    fn band(&self) -> Band;

    /// Tune to a frequency in kHz
    ///
    /// Frequencies outside the band limits are clamped to the nearest
    /// bound before being written.
    fn tune_khz(&mut self, khz: u32) -> Result<(), Self::Error>;

    /// Read back the currently tuned frequency in kHz from the chip
    fn frequency_khz(&mut self) -> Result<u32, Self::Error>;

    /// Adjust the tuned frequency by a signed offset in kHz
    ///
    /// The result is clamped to the band limits. A negative offset also
    /// flips the stored search direction to `Down`, a positive one to
    /// `Up`, so a subsequent search continues the way the user was
    /// stepping.
    fn step_khz(&mut self, delta_khz: i32) -> Result<(), Self::Error>;

    /// Arm the chip's automatic station search
    ///
    /// The search starts from the currently tuned frequency and runs in
    /// `direction` until a station reaching `stop` is found or the band
    /// limit is hit. Completion is reported through [`FmTuner::status`].
    fn start_search(
        &mut self,
        direction: SearchDirection,
        stop: SearchStopLevel,
    ) -> Result<(), Self::Error>;

    /// Disarm a running search, leaving the tuner where it currently is
    fn stop_search(&mut self) -> Result<(), Self::Error>;

    /// Mute or unmute both audio channels
    fn set_mute(&mut self, mute: bool) -> Result<(), Self::Error>;

    /// Enable or disable soft mute
    ///
    /// Soft mute suppresses interstation noise at the cost of some
    /// distortion on weak signals.
    fn set_soft_mute(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Mute or unmute the left audio channel only
    fn set_mute_left(&mut self, mute: bool) -> Result<(), Self::Error>;

    /// Mute or unmute the right audio channel only
    fn set_mute_right(&mut self, mute: bool) -> Result<(), Self::Error>;

    /// Enter or leave standby
    ///
    /// In standby the chip draws minimal current and does not receive.
    /// All other control settings are retained and re-applied on wake.
    fn set_standby(&mut self, standby: bool) -> Result<(), Self::Error>;

    /// Select stereo reception (true) or forced mono (false)
    fn set_stereo(&mut self, stereo: bool) -> Result<(), Self::Error>;

    /// Read and decode the chip status
    fn status(&mut self) -> Result<TunerStatus, Self::Error>;

    /// Tune to a frequency in MHz
    fn tune_mhz(&mut self, mhz: f32) -> Result<(), Self::Error> {
        self.tune_khz(mhz_to_khz(mhz))
    }

    /// Read back the currently tuned frequency in MHz
    fn frequency_mhz(&mut self) -> Result<f32, Self::Error> {
        self.frequency_khz().map(khz_to_mhz)
    }

    /// Check whether the last tune or search operation has settled
    fn is_ready(&mut self) -> Result<bool, Self::Error> {
        self.status().map(|s| s.ready)
    }
}

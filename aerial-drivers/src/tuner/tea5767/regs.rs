//! TEA5767 register encoding and decoding
//!
//! The chip exposes a single five-byte window in each direction. All
//! functions here are pure: [`TunerState::to_frame`] packs the control
//! state into the write frame, [`StatusFrame::from_frame`] unpacks a
//! read frame. No bus access happens in this module.

use aerial_core::band::Band;
use aerial_core::traits::{
    DeEmphasis, SearchDirection, SearchStopLevel, SignalLevel, TunerStatus,
};

/// Number of data bytes per bus transaction
pub const FRAME_LEN: usize = 5;

/// Write frame bit assignments
pub mod wr {
    /// Byte 1: mute both audio channels
    pub const MUTE: u8 = 0x80;
    /// Byte 1: search mode armed
    pub const SEARCH: u8 = 0x40;
    /// Byte 1: upper six bits of the PLL word
    pub const PLL_HI_MASK: u8 = 0x3F;
    /// Byte 3: search towards the upper band limit
    pub const SEARCH_UP: u8 = 0x80;
    /// Byte 3: search stop level field position
    pub const SSL_SHIFT: u8 = 5;
    /// Byte 3: high-side LO injection
    pub const HLSI: u8 = 0x10;
    /// Byte 3: forced mono
    pub const MONO: u8 = 0x08;
    /// Byte 3: mute right channel
    pub const MUTE_RIGHT: u8 = 0x04;
    /// Byte 3: mute left channel
    pub const MUTE_LEFT: u8 = 0x02;
    /// Byte 3: software programmable port 1
    pub const SWP1: u8 = 0x01;
    /// Byte 4: software programmable port 2
    pub const SWP2: u8 = 0x80;
    /// Byte 4: standby
    pub const STANDBY: u8 = 0x40;
    /// Byte 4: Japanese band limits
    pub const BAND_JAPAN: u8 = 0x20;
    /// Byte 4: 32.768 kHz crystal
    pub const XTAL: u8 = 0x10;
    /// Byte 4: soft mute
    pub const SOFT_MUTE: u8 = 0x08;
    /// Byte 4: high cut control
    pub const HIGH_CUT: u8 = 0x04;
    /// Byte 4: stereo noise cancelling
    pub const SNC: u8 = 0x02;
    /// Byte 4: search indicator on port SWP1
    pub const SEARCH_IND: u8 = 0x01;
    /// Byte 5: 6.5 MHz PLL reference
    pub const PLLREF: u8 = 0x80;
    /// Byte 5: 75 us de-emphasis (50 us when clear)
    pub const DTC_75US: u8 = 0x40;
}

/// Read frame bit assignments
pub mod rd {
    /// Byte 1: tune or search operation settled
    pub const READY: u8 = 0x80;
    /// Byte 1: search hit the band limit
    pub const BAND_LIMIT: u8 = 0x40;
    /// Byte 1: upper six bits of the PLL word
    pub const PLL_HI_MASK: u8 = 0x3F;
    /// Byte 3: stereo reception
    pub const STEREO: u8 = 0x80;
    /// Byte 3: IF counter result
    pub const IF_MASK: u8 = 0x7F;
    /// Byte 4: ADC level field position
    pub const LEVEL_SHIFT: u8 = 4;
    /// Byte 4: chip identification field
    pub const CHIP_ID_MASK: u8 = 0x0E;
}

/// Intermediate frequency offset for high-side injection, in Hz
const IF_OFFSET_HZ: u32 = 225_000;

/// PLL reference with the 32.768 kHz crystal, in Hz
const REF_HZ: u32 = 32_768;

/// Compute the 14-bit PLL word for a frequency in kHz
///
/// High-side injection: N = 4 x (f + 225 kHz) / 32.768 kHz, rounded
/// to the nearest PLL step (~8.2 kHz).
pub fn pll_word_from_khz(khz: u32) -> u16 {
    let hz = khz * 1_000 + IF_OFFSET_HZ;
    (((4 * hz + REF_HZ / 2) / REF_HZ) & 0x3FFF) as u16
}

/// Recover the tuned frequency in kHz from a 14-bit PLL word
pub fn khz_from_pll_word(word: u16) -> u32 {
    let hz = (word as u32) * (REF_HZ / 4);
    (hz.saturating_sub(IF_OFFSET_HZ) + 500) / 1_000
}

/// Shadow of the TEA5767 control registers
///
/// Holds every control flag the chip knows about. The driver mutates
/// this state and rewrites the whole frame; the chip has no way to
/// update a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TunerState {
    /// Broadcast band selecting the tuning limits
    pub band: Band,
    /// Target frequency in kHz, clamped to the band on encode
    pub frequency_khz: u32,
    /// Mute both audio channels
    pub mute: bool,
    /// Mute the left channel only
    pub mute_left: bool,
    /// Mute the right channel only
    pub mute_right: bool,
    /// Soft mute (interstation noise suppression)
    pub soft_mute: bool,
    /// Standby (receiver powered down, settings retained)
    pub standby: bool,
    /// Search mode armed; audio is muted while a search runs
    pub search: bool,
    /// Direction for the next search
    pub search_direction: SearchDirection,
    /// Signal level at which a search stops
    pub search_stop: SearchStopLevel,
    /// Forced mono reception
    pub forced_mono: bool,
    /// Stereo noise cancelling
    pub stereo_noise_cancel: bool,
    /// High cut control (treble attenuation on weak signals)
    pub high_cut: bool,
    /// Audio de-emphasis time constant
    pub de_emphasis: DeEmphasis,
}

impl Default for TunerState {
    fn default() -> Self {
        Self::for_band(Band::Europe)
    }
}

impl TunerState {
    /// Power-on control state for a band
    ///
    /// Tuned to the bottom of the band, audio on, stereo reception
    /// with noise cancelling enabled, search disarmed.
    pub fn for_band(band: Band) -> Self {
        Self {
            band,
            frequency_khz: band.min_khz(),
            mute: false,
            mute_left: false,
            mute_right: false,
            soft_mute: false,
            standby: false,
            search: false,
            search_direction: SearchDirection::Up,
            search_stop: SearchStopLevel::Mid,
            forced_mono: false,
            stereo_noise_cancel: true,
            high_cut: false,
            de_emphasis: DeEmphasis::Us50,
        }
    }

    /// The PLL word for the current (band-clamped) frequency
    pub fn pll_word(&self) -> u16 {
        pll_word_from_khz(self.band.clamp_khz(self.frequency_khz))
    }

    /// Pack the control state into the five-byte write frame
    ///
    /// Reserved bits are written as zero. The frequency is clamped to
    /// the band limits before encoding.
    pub fn to_frame(&self) -> [u8; FRAME_LEN] {
        let pll = self.pll_word();
        let mut frame = [0u8; FRAME_LEN];

        frame[0] = (pll >> 8) as u8 & wr::PLL_HI_MASK;
        if self.mute || self.search {
            frame[0] |= wr::MUTE;
        }
        if self.search {
            frame[0] |= wr::SEARCH;
        }

        frame[1] = pll as u8;

        frame[2] = wr::HLSI | (stop_level_bits(self.search_stop) << wr::SSL_SHIFT);
        if self.search_direction == SearchDirection::Up {
            frame[2] |= wr::SEARCH_UP;
        }
        if self.forced_mono {
            frame[2] |= wr::MONO;
        }
        if self.mute_right {
            frame[2] |= wr::MUTE_RIGHT;
        }
        if self.mute_left {
            frame[2] |= wr::MUTE_LEFT;
        }

        frame[3] = wr::XTAL;
        if self.standby {
            frame[3] |= wr::STANDBY;
        }
        if self.band == Band::Japan {
            frame[3] |= wr::BAND_JAPAN;
        }
        if self.soft_mute {
            frame[3] |= wr::SOFT_MUTE;
        }
        if self.high_cut {
            frame[3] |= wr::HIGH_CUT;
        }
        if self.stereo_noise_cancel {
            frame[3] |= wr::SNC;
        }

        if self.de_emphasis == DeEmphasis::Us75 {
            frame[4] = wr::DTC_75US;
        }

        frame
    }
}

/// Search stop level field value (SSL1..SSL0)
fn stop_level_bits(stop: SearchStopLevel) -> u8 {
    match stop {
        SearchStopLevel::Low => 0b01,
        SearchStopLevel::Mid => 0b10,
        SearchStopLevel::High => 0b11,
    }
}

/// Decoded five-byte status frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusFrame {
    /// Tune or search operation settled
    pub ready: bool,
    /// Search hit the band limit
    pub band_limit: bool,
    /// 14-bit PLL word currently in use
    pub pll: u16,
    /// Stereo transmission received
    pub stereo: bool,
    /// IF counter result
    pub if_counter: u8,
    /// ADC level reading (0-15)
    pub level: u8,
    /// Chip identification bits, always zero on a TEA5767
    pub chip_id: u8,
}

impl StatusFrame {
    /// Unpack a five-byte read frame
    pub fn from_frame(frame: &[u8; FRAME_LEN]) -> Self {
        Self {
            ready: frame[0] & rd::READY != 0,
            band_limit: frame[0] & rd::BAND_LIMIT != 0,
            pll: ((frame[0] & rd::PLL_HI_MASK) as u16) << 8 | frame[1] as u16,
            stereo: frame[2] & rd::STEREO != 0,
            if_counter: frame[2] & rd::IF_MASK,
            level: frame[3] >> rd::LEVEL_SHIFT,
            chip_id: (frame[3] & rd::CHIP_ID_MASK) >> 1,
        }
    }

    /// The tuned frequency in kHz implied by the PLL word
    pub fn frequency_khz(&self) -> u32 {
        khz_from_pll_word(self.pll)
    }

    /// Convert into the chip-agnostic status type
    pub fn to_status(&self) -> TunerStatus {
        TunerStatus {
            ready: self.ready,
            band_limit: self.band_limit,
            stereo: self.stereo,
            signal: SignalLevel(self.level),
            frequency_khz: self.frequency_khz(),
            if_counter: self.if_counter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_pll_word_known_values() {
        // 4 * (100.225 MHz) / 32768 Hz = 12234.5
        assert_eq!(pll_word_from_khz(100_000), 12234);
        // Band edges
        assert_eq!(pll_word_from_khz(87_500), 10709);
        assert_eq!(pll_word_from_khz(108_000), 13211);
        assert_eq!(pll_word_from_khz(76_000), 9305);
    }

    #[test]
    fn test_khz_from_pll_word() {
        assert_eq!(khz_from_pll_word(13211), 108_000);
        assert_eq!(khz_from_pll_word(10709), 87_503);
        // A zero word saturates instead of wrapping
        assert_eq!(khz_from_pll_word(0), 0);
    }

    #[test]
    fn test_default_frame_europe() {
        let state = TunerState::default();
        let frame = state.to_frame();

        // 87.5 MHz -> PLL 10709 = 0x29D5
        assert_eq!(frame[0], 0x29);
        assert_eq!(frame[1], 0xD5);
        // Search up, mid stop level, high-side injection
        assert_eq!(frame[2], wr::SEARCH_UP | (0b10 << wr::SSL_SHIFT) | wr::HLSI);
        // Crystal select plus stereo noise cancelling
        assert_eq!(frame[3], wr::XTAL | wr::SNC);
        // 50 us de-emphasis, reserved bits zero
        assert_eq!(frame[4], 0x00);
    }

    #[test]
    fn test_frame_100_mhz() {
        let state = TunerState {
            frequency_khz: 100_000,
            ..TunerState::default()
        };
        let frame = state.to_frame();

        // PLL 12234 = 0x2FCA
        assert_eq!(frame[0], 0x2F);
        assert_eq!(frame[1], 0xCA);
    }

    #[test]
    fn test_frame_clamps_to_band() {
        let state = TunerState {
            frequency_khz: 150_000,
            ..TunerState::default()
        };
        // Encoded as 108.0 MHz, not 150 MHz
        assert_eq!(state.pll_word(), pll_word_from_khz(108_000));
    }

    #[test]
    fn test_frame_japan_band() {
        let state = TunerState::for_band(Band::Japan);
        let frame = state.to_frame();

        assert_eq!(state.frequency_khz, 76_000);
        assert_ne!(frame[3] & wr::BAND_JAPAN, 0);
        // PLL 9305 = 0x2459
        assert_eq!(frame[0], 0x24);
        assert_eq!(frame[1], 0x59);
    }

    #[test]
    fn test_frame_mute_bits() {
        let mut state = TunerState::default();
        state.mute = true;
        assert_ne!(state.to_frame()[0] & wr::MUTE, 0);

        state.mute = false;
        state.mute_left = true;
        state.mute_right = true;
        let frame = state.to_frame();
        assert_eq!(frame[0] & wr::MUTE, 0);
        assert_ne!(frame[2] & wr::MUTE_LEFT, 0);
        assert_ne!(frame[2] & wr::MUTE_RIGHT, 0);
    }

    #[test]
    fn test_search_mutes_audio() {
        let mut state = TunerState::default();
        state.search = true;
        let frame = state.to_frame();

        assert_ne!(frame[0] & wr::SEARCH, 0);
        // Audio path is muted while the search runs
        assert_ne!(frame[0] & wr::MUTE, 0);
    }

    #[test]
    fn test_search_direction_bit() {
        let mut state = TunerState::default();
        state.search_direction = SearchDirection::Down;
        assert_eq!(state.to_frame()[2] & wr::SEARCH_UP, 0);

        state.search_direction = SearchDirection::Up;
        assert_ne!(state.to_frame()[2] & wr::SEARCH_UP, 0);
    }

    #[test]
    fn test_stop_level_field() {
        for (stop, bits) in [
            (SearchStopLevel::Low, 0b01),
            (SearchStopLevel::Mid, 0b10),
            (SearchStopLevel::High, 0b11),
        ] {
            let state = TunerState {
                search_stop: stop,
                ..TunerState::default()
            };
            assert_eq!((state.to_frame()[2] >> wr::SSL_SHIFT) & 0b11, bits);
        }
    }

    #[test]
    fn test_standby_and_audio_bits() {
        let mut state = TunerState::default();
        state.standby = true;
        state.soft_mute = true;
        state.high_cut = true;
        state.forced_mono = true;
        state.de_emphasis = DeEmphasis::Us75;
        let frame = state.to_frame();

        assert_ne!(frame[3] & wr::STANDBY, 0);
        assert_ne!(frame[3] & wr::SOFT_MUTE, 0);
        assert_ne!(frame[3] & wr::HIGH_CUT, 0);
        assert_ne!(frame[2] & wr::MONO, 0);
        assert_eq!(frame[4], wr::DTC_75US);
    }

    #[test]
    fn test_status_frame_decode() {
        // Ready, stereo station at PLL 0x335A with level 10
        let frame = [0x80 | 0x33, 0x5A, 0x80 | 0x25, 0xA0, 0x00];
        let status = StatusFrame::from_frame(&frame);

        assert!(status.ready);
        assert!(!status.band_limit);
        assert_eq!(status.pll, 0x335A);
        assert!(status.stereo);
        assert_eq!(status.if_counter, 0x25);
        assert_eq!(status.level, 10);
        assert_eq!(status.chip_id, 0);
    }

    #[test]
    fn test_status_frame_band_limit() {
        let frame = [0x80 | 0x40 | 0x29, 0xD5, 0x00, 0x00, 0x00];
        let status = StatusFrame::from_frame(&frame);

        assert!(status.ready);
        assert!(status.band_limit);
        assert!(!status.stereo);
    }

    #[test]
    fn test_status_to_tuner_status() {
        let frame = [0x80 | 0x2F, 0xCA, 0x80, 0x70, 0x00];
        let status = StatusFrame::from_frame(&frame).to_status();

        assert!(status.ready);
        assert!(status.stereo);
        assert_eq!(status.signal, SignalLevel(7));
        // PLL 0x2FCA decodes back near 100.0 MHz
        assert!(status.frequency_khz.abs_diff(100_000) < 9);
    }

    proptest! {
        #[test]
        fn pll_roundtrip_within_one_step(khz in 76_000u32..=108_000) {
            let decoded = khz_from_pll_word(pll_word_from_khz(khz));
            // One PLL step is 8.192 kHz
            prop_assert!(decoded.abs_diff(khz) <= 9);
        }

        #[test]
        fn pll_word_roundtrip_exact(word in 9305u16..=13211) {
            prop_assert_eq!(pll_word_from_khz(khz_from_pll_word(word)), word);
        }

        #[test]
        fn encoded_frequency_always_in_band(khz in 0u32..1_000_000) {
            for band in [Band::Europe, Band::Japan] {
                let state = TunerState {
                    band,
                    frequency_khz: khz,
                    ..TunerState::for_band(band)
                };
                let decoded = khz_from_pll_word(state.pll_word());
                prop_assert!(decoded >= band.min_khz().saturating_sub(9));
                prop_assert!(decoded <= band.max_khz() + 9);
            }
        }

        #[test]
        fn reserved_bits_stay_zero(mute in any::<bool>(), search in any::<bool>(),
                                   standby in any::<bool>(), us75 in any::<bool>()) {
            let state = TunerState {
                mute,
                search,
                standby,
                de_emphasis: if us75 { DeEmphasis::Us75 } else { DeEmphasis::Us50 },
                ..TunerState::default()
            };
            let frame = state.to_frame();
            // Byte 5 only carries PLLREF and DTC; PLLREF is never set
            prop_assert_eq!(frame[4] & !wr::DTC_75US, 0);
        }
    }
}

//! Async TEA5767 driver
//!
//! Same state machine and frame encoding as [`super::blocking`], with
//! the bus edge awaited. Useful under async executors where the I2C
//! peripheral and delays are interrupt-driven.

use aerial_core::band::Band;
use aerial_core::traits::tuner::{khz_to_mhz, mhz_to_khz};
use aerial_core::traits::{DeEmphasis, SearchDirection, SearchStopLevel, TunerStatus};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use heapless::Vec;

use super::regs::{StatusFrame, TunerState, FRAME_LEN};
use super::{Error, ADDRESS};

/// Ready-flag polling interval
const POLL_INTERVAL_MS: u32 = 10;

/// Polling budget for a single search
const SEARCH_TIMEOUT_MS: u32 = 2_000;

/// Channel spacing used to step off the current station before a search
const CHANNEL_STEP_KHZ: u32 = 100;

/// Maximum number of stations a band scan collects
pub const SCAN_CAPACITY: usize = 32;

/// Async TEA5767 driver
pub struct Tea5767<I2C> {
    i2c: I2C,
    state: TunerState,
}

impl<I2C: I2c> Tea5767<I2C> {
    /// Create a driver tuned to the bottom of `band`
    pub fn new(i2c: I2C, band: Band) -> Self {
        Self {
            i2c,
            state: TunerState::for_band(band),
        }
    }

    /// Create a driver with an explicit control state
    pub fn with_state(i2c: I2C, state: TunerState) -> Self {
        Self { i2c, state }
    }

    /// Write the power-on control state to the chip
    pub async fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        self.apply(|_| {}).await
    }

    /// The control state last written to the chip
    pub fn state(&self) -> &TunerState {
        &self.state
    }

    /// Deconstruct the driver and release the bus handle
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Mutate a copy of the control state and write it out
    ///
    /// The shadow state is only committed after the bus write succeeds.
    async fn apply<F>(&mut self, f: F) -> Result<(), Error<I2C::Error>>
    where
        F: FnOnce(&mut TunerState),
    {
        let mut next = self.state;
        f(&mut next);
        self.i2c.write(ADDRESS, &next.to_frame()).await?;
        self.state = next;
        Ok(())
    }

    /// Read and decode the five-byte status frame
    pub async fn read_frame(&mut self) -> Result<StatusFrame, Error<I2C::Error>> {
        let mut frame = [0u8; FRAME_LEN];
        self.i2c.read(ADDRESS, &mut frame).await?;
        Ok(StatusFrame::from_frame(&frame))
    }

    /// Tune to a frequency in kHz, clamped to the band limits
    pub async fn tune_khz(&mut self, khz: u32) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| {
            s.frequency_khz = s.band.clamp_khz(khz);
            s.search = false;
        })
        .await
    }

    /// Read back the currently tuned frequency from the chip
    pub async fn frequency_khz(&mut self) -> Result<u32, Error<I2C::Error>> {
        Ok(self.read_frame().await?.frequency_khz())
    }

    /// Tune to a frequency in MHz
    pub async fn tune_mhz(&mut self, mhz: f32) -> Result<(), Error<I2C::Error>> {
        self.tune_khz(mhz_to_khz(mhz)).await
    }

    /// Read back the currently tuned frequency in MHz
    pub async fn frequency_mhz(&mut self) -> Result<f32, Error<I2C::Error>> {
        Ok(khz_to_mhz(self.frequency_khz().await?))
    }

    /// Adjust the tuned frequency by a signed offset in kHz
    pub async fn step_khz(&mut self, delta_khz: i32) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| {
            s.search_direction = if delta_khz < 0 {
                SearchDirection::Down
            } else {
                SearchDirection::Up
            };
            s.frequency_khz = s.band.clamp_khz(s.frequency_khz.saturating_add_signed(delta_khz));
        })
        .await
    }

    /// Arm the chip's automatic station search
    pub async fn start_search(
        &mut self,
        direction: SearchDirection,
        stop: SearchStopLevel,
    ) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| {
            s.search = true;
            s.search_direction = direction;
            s.search_stop = stop;
        })
        .await
    }

    /// Disarm a running search
    pub async fn stop_search(&mut self) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.search = false).await
    }

    /// Check whether the last tune or search operation has settled
    pub async fn is_ready(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read_frame().await?.ready)
    }

    /// Poll the ready flag until it asserts or `timeout_ms` elapses
    pub async fn wait_ready<D: DelayNs>(
        &mut self,
        delay: &mut D,
        timeout_ms: u32,
    ) -> Result<StatusFrame, Error<I2C::Error>> {
        let mut waited_ms = 0;
        loop {
            let frame = self.read_frame().await?;
            if frame.ready {
                return Ok(frame);
            }
            if waited_ms >= timeout_ms {
                return Err(Error::Timeout);
            }
            delay.delay_ms(POLL_INTERVAL_MS).await;
            waited_ms += POLL_INTERVAL_MS;
        }
    }

    /// Search for the next station and report where the chip landed
    ///
    /// Semantics match the blocking driver: the search steps one
    /// channel off the current station before arming, and the band
    /// limit disarms the search and surfaces as [`Error::BandLimit`].
    pub async fn search<D: DelayNs>(
        &mut self,
        delay: &mut D,
        direction: SearchDirection,
        stop: SearchStopLevel,
    ) -> Result<u32, Error<I2C::Error>> {
        self.apply(|s| {
            let step = match direction {
                SearchDirection::Up => CHANNEL_STEP_KHZ as i32,
                SearchDirection::Down => -(CHANNEL_STEP_KHZ as i32),
            };
            s.frequency_khz = s.band.clamp_khz(s.frequency_khz.saturating_add_signed(step));
            s.search = true;
            s.search_direction = direction;
            s.search_stop = stop;
        })
        .await?;

        match self.wait_ready(delay, SEARCH_TIMEOUT_MS).await {
            Ok(frame) if frame.band_limit => {
                self.stop_search().await?;
                Err(Error::BandLimit)
            }
            Ok(frame) => {
                let khz = frame.frequency_khz();
                self.apply(|s| {
                    s.search = false;
                    s.frequency_khz = khz;
                })
                .await?;
                Ok(khz)
            }
            Err(err) => {
                self.stop_search().await?;
                Err(err)
            }
        }
    }

    /// Sweep the band upward and collect every receivable station
    pub async fn scan<D: DelayNs>(
        &mut self,
        delay: &mut D,
        stop: SearchStopLevel,
    ) -> Result<Vec<u32, SCAN_CAPACITY>, Error<I2C::Error>> {
        let mut stations = Vec::new();
        let bottom = self.state.band.min_khz();
        self.tune_khz(bottom).await?;

        loop {
            match self.search(delay, SearchDirection::Up, stop).await {
                Ok(khz) => {
                    if let Some(&last) = stations.last() {
                        if khz <= last {
                            break;
                        }
                    }
                    if stations.push(khz).is_err() {
                        break;
                    }
                }
                Err(Error::BandLimit) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(stations)
    }

    /// Mute or unmute both audio channels
    pub async fn set_mute(&mut self, mute: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.mute = mute).await
    }

    /// Enable or disable soft mute
    pub async fn set_soft_mute(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.soft_mute = enabled).await
    }

    /// Mute or unmute the left audio channel
    pub async fn set_mute_left(&mut self, mute: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.mute_left = mute).await
    }

    /// Mute or unmute the right audio channel
    pub async fn set_mute_right(&mut self, mute: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.mute_right = mute).await
    }

    /// Enter or leave standby
    pub async fn set_standby(&mut self, standby: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.standby = standby).await
    }

    /// Select stereo reception (true) or forced mono (false)
    pub async fn set_stereo(&mut self, stereo: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.forced_mono = !stereo).await
    }

    /// Enable or disable stereo noise cancelling
    pub async fn set_stereo_noise_cancel(
        &mut self,
        enabled: bool,
    ) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.stereo_noise_cancel = enabled).await
    }

    /// Enable or disable high cut control
    pub async fn set_high_cut(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.high_cut = enabled).await
    }

    /// Select the audio de-emphasis time constant
    pub async fn set_de_emphasis(
        &mut self,
        de_emphasis: DeEmphasis,
    ) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.de_emphasis = de_emphasis).await
    }

    /// Read and decode the chip status
    pub async fn status(&mut self) -> Result<TunerStatus, Error<I2C::Error>> {
        Ok(self.read_frame().await?.to_status())
    }
}

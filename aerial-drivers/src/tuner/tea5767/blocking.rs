//! Blocking TEA5767 driver
//!
//! Drives the chip over a blocking `embedded-hal` I2C bus. The driver
//! owns a [`TunerState`] shadow of the control registers; every
//! mutation re-encodes and writes the full five-byte frame.

use aerial_core::band::Band;
use aerial_core::traits::{
    DeEmphasis, FmTuner, SearchDirection, SearchStopLevel, TunerStatus,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
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

/// Blocking TEA5767 driver
pub struct Tea5767<I2C> {
    i2c: I2C,
    state: TunerState,
}

impl<I2C: I2c> Tea5767<I2C> {
    /// Create a driver tuned to the bottom of `band`
    ///
    /// Nothing is written to the chip until [`Tea5767::init`] or the
    /// first operation.
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
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        self.apply(|_| {})
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
    /// The shadow state is only committed after the bus write succeeds,
    /// so a failed write leaves the driver consistent with the chip.
    fn apply<F>(&mut self, f: F) -> Result<(), Error<I2C::Error>>
    where
        F: FnOnce(&mut TunerState),
    {
        let mut next = self.state;
        f(&mut next);
        self.i2c.write(ADDRESS, &next.to_frame())?;
        self.state = next;
        Ok(())
    }

    /// Read and decode the five-byte status frame
    pub fn read_frame(&mut self) -> Result<StatusFrame, Error<I2C::Error>> {
        let mut frame = [0u8; FRAME_LEN];
        self.i2c.read(ADDRESS, &mut frame)?;
        Ok(StatusFrame::from_frame(&frame))
    }

    /// Tune to a frequency in kHz, clamped to the band limits
    pub fn tune_khz(&mut self, khz: u32) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| {
            s.frequency_khz = s.band.clamp_khz(khz);
            s.search = false;
        })
    }

    /// Read back the currently tuned frequency from the chip
    pub fn frequency_khz(&mut self) -> Result<u32, Error<I2C::Error>> {
        self.read_frame().map(|f| f.frequency_khz())
    }

    /// Adjust the tuned frequency by a signed offset in kHz
    ///
    /// The stored search direction follows the sign of the offset, so a
    /// later search continues the way the user was stepping.
    pub fn step_khz(&mut self, delta_khz: i32) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| {
            s.search_direction = if delta_khz < 0 {
                SearchDirection::Down
            } else {
                SearchDirection::Up
            };
            s.frequency_khz = s.band.clamp_khz(s.frequency_khz.saturating_add_signed(delta_khz));
        })
    }

    /// Arm the chip's automatic station search
    pub fn start_search(
        &mut self,
        direction: SearchDirection,
        stop: SearchStopLevel,
    ) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| {
            s.search = true;
            s.search_direction = direction;
            s.search_stop = stop;
        })
    }

    /// Disarm a running search
    pub fn stop_search(&mut self) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.search = false)
    }

    /// Check whether the last tune or search operation has settled
    pub fn is_ready(&mut self) -> Result<bool, Error<I2C::Error>> {
        self.read_frame().map(|f| f.ready)
    }

    /// Poll the ready flag until it asserts or `timeout_ms` elapses
    pub fn wait_ready<D: DelayNs>(
        &mut self,
        delay: &mut D,
        timeout_ms: u32,
    ) -> Result<StatusFrame, Error<I2C::Error>> {
        let mut waited_ms = 0;
        loop {
            let frame = self.read_frame()?;
            if frame.ready {
                return Ok(frame);
            }
            if waited_ms >= timeout_ms {
                return Err(Error::Timeout);
            }
            delay.delay_ms(POLL_INTERVAL_MS);
            waited_ms += POLL_INTERVAL_MS;
        }
    }

    /// Search for the next station and report where the chip landed
    ///
    /// The search begins one channel step away from the current
    /// frequency so the station already tuned is not immediately
    /// re-found. Audio stays muted while the search runs; the caller's
    /// mute setting is restored when it resolves. Hitting the band
    /// limit disarms the search and returns [`Error::BandLimit`].
    pub fn search<D: DelayNs>(
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
        })?;

        match self.wait_ready(delay, SEARCH_TIMEOUT_MS) {
            Ok(frame) if frame.band_limit => {
                self.stop_search()?;
                Err(Error::BandLimit)
            }
            Ok(frame) => {
                let khz = frame.frequency_khz();
                self.apply(|s| {
                    s.search = false;
                    s.frequency_khz = khz;
                })?;
                Ok(khz)
            }
            Err(err) => {
                self.stop_search()?;
                Err(err)
            }
        }
    }

    /// Sweep the band upward and collect every receivable station
    ///
    /// Starts from the bottom of the band and repeats the chip search
    /// until the band limit is hit or the result vector is full. The
    /// tuner is left on the last station found.
    pub fn scan<D: DelayNs>(
        &mut self,
        delay: &mut D,
        stop: SearchStopLevel,
    ) -> Result<Vec<u32, SCAN_CAPACITY>, Error<I2C::Error>> {
        let mut stations = Vec::new();
        self.tune_khz(self.state.band.min_khz())?;

        loop {
            match self.search(delay, SearchDirection::Up, stop) {
                Ok(khz) => {
                    // A non-increasing hit means the chip latched the
                    // same station again; stop rather than loop.
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
    pub fn set_mute(&mut self, mute: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.mute = mute)
    }

    /// Enable or disable soft mute
    pub fn set_soft_mute(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.soft_mute = enabled)
    }

    /// Mute or unmute the left audio channel
    pub fn set_mute_left(&mut self, mute: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.mute_left = mute)
    }

    /// Mute or unmute the right audio channel
    pub fn set_mute_right(&mut self, mute: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.mute_right = mute)
    }

    /// Enter or leave standby
    pub fn set_standby(&mut self, standby: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.standby = standby)
    }

    /// Select stereo reception (true) or forced mono (false)
    pub fn set_stereo(&mut self, stereo: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.forced_mono = !stereo)
    }

    /// Enable or disable stereo noise cancelling
    pub fn set_stereo_noise_cancel(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.stereo_noise_cancel = enabled)
    }

    /// Enable or disable high cut control
    pub fn set_high_cut(&mut self, enabled: bool) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.high_cut = enabled)
    }

    /// Select the audio de-emphasis time constant
    pub fn set_de_emphasis(&mut self, de_emphasis: DeEmphasis) -> Result<(), Error<I2C::Error>> {
        self.apply(|s| s.de_emphasis = de_emphasis)
    }

    /// Read and decode the chip status
    pub fn status(&mut self) -> Result<TunerStatus, Error<I2C::Error>> {
        self.read_frame().map(|f| f.to_status())
    }
}

impl<I2C: I2c> FmTuner for Tea5767<I2C> {
    type Error = Error<I2C::Error>;

    fn band(&self) -> Band {
        self.state.band
    }

    fn tune_khz(&mut self, khz: u32) -> Result<(), Self::Error> {
        self.tune_khz(khz)
    }

    fn frequency_khz(&mut self) -> Result<u32, Self::Error> {
        self.frequency_khz()
    }

    fn step_khz(&mut self, delta_khz: i32) -> Result<(), Self::Error> {
        self.step_khz(delta_khz)
    }

    fn start_search(
        &mut self,
        direction: SearchDirection,
        stop: SearchStopLevel,
    ) -> Result<(), Self::Error> {
        self.start_search(direction, stop)
    }

    fn stop_search(&mut self) -> Result<(), Self::Error> {
        self.stop_search()
    }

    fn set_mute(&mut self, mute: bool) -> Result<(), Self::Error> {
        self.set_mute(mute)
    }

    fn set_soft_mute(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.set_soft_mute(enabled)
    }

    fn set_mute_left(&mut self, mute: bool) -> Result<(), Self::Error> {
        self.set_mute_left(mute)
    }

    fn set_mute_right(&mut self, mute: bool) -> Result<(), Self::Error> {
        self.set_mute_right(mute)
    }

    fn set_standby(&mut self, standby: bool) -> Result<(), Self::Error> {
        self.set_standby(standby)
    }

    fn set_stereo(&mut self, stereo: bool) -> Result<(), Self::Error> {
        self.set_stereo(stereo)
    }

    fn status(&mut self) -> Result<TunerStatus, Self::Error> {
        self.status()
    }
}

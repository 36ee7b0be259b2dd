//! Overdrive Pedal
//!
//! A tube-screamer-style overdrive chain: the input is padded by ~−10 dB
//! and rumble-filtered by a 2nd-order high-pass at 16 Hz, pre-shaped by a
//! +20 dB high shelf at 200 Hz and a drive-controlled mid peak, then only
//! the difference from the high-passed signal is saturated (the classic
//! clean-blend trick that keeps low end intact), and finally voiced by a
//! tone low-pass and an output volume gain.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::gain::GainCoeffs;
use crate::hs1::{Hs1Coeffs, Hs1State};
use crate::lp1::{Lp1Coeffs, Lp1State};
use crate::peak::{PeakCoeffs, PeakState};
use crate::satur::{SaturCoeffs, SaturState};
use crate::svf::{SvfCoeffs, SvfState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct DriveCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    hp2_coeffs: SvfCoeffs,
    hs1_coeffs: Hs1Coeffs,
    peak_coeffs: PeakCoeffs,
    satur_coeffs: SaturCoeffs,
    lp1_coeffs: Lp1Coeffs,
    gain_coeffs: GainCoeffs,
}

/// Per-voice pedal memory.
#[derive(Debug, Clone, Default)]
pub struct DriveState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    hp2_state: SvfState,
    hs1_state: Hs1State,
    peak_state: PeakState,
    satur_state: SaturState,
    lp1_state: Lp1State,
}

impl DriveState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriveCoeffs {
    /// Creates coefficients with default parameters: drive `0`, tone
    /// `0.5`, volume `1`.
    pub fn new() -> Self {
        let mut hp2_coeffs = SvfCoeffs::new();
        let mut hs1_coeffs = Hs1Coeffs::new();
        let mut peak_coeffs = PeakCoeffs::new();
        let mut satur_coeffs = SaturCoeffs::new();
        let mut lp1_coeffs = Lp1Coeffs::new();
        hp2_coeffs.set_cutoff(16.0);
        hs1_coeffs.set_cutoff(200.0);
        hs1_coeffs.set_high_gain_db(20.0);
        peak_coeffs.set_peak_gain_db(0.0);
        peak_coeffs.set_cutoff(500.0);
        peak_coeffs.set_bandwidth(9.5);
        satur_coeffs.set_gain(1.5);
        satur_coeffs.set_gain_compensation(true);
        lp1_coeffs.set_cutoff(400.0 + (5e3 - 400.0) * 0.125);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("drive_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            hp2_coeffs,
            hs1_coeffs,
            peak_coeffs,
            satur_coeffs,
            lp1_coeffs,
            gain_coeffs: GainCoeffs::new(),
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.hp2_coeffs.set_sample_rate(sample_rate);
        self.hs1_coeffs.set_sample_rate(sample_rate);
        self.peak_coeffs.set_sample_rate(sample_rate);
        self.satur_coeffs.set_sample_rate(sample_rate);
        self.lp1_coeffs.set_sample_rate(sample_rate);
        self.gain_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.hp2_coeffs.reset_coeffs();
        self.hs1_coeffs.reset_coeffs();
        self.peak_coeffs.reset_coeffs();
        self.satur_coeffs.reset_coeffs();
        self.lp1_coeffs.reset_coeffs();
        self.gain_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// output.
    pub fn reset_state(&self, state: &mut DriveState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let (_, _, hp) = self.hp2_coeffs.reset_state(&mut state.hp2_state, 0.316 * x0);
        let y = self.hs1_coeffs.reset_state(&mut state.hs1_state, hp);
        let y = self.peak_coeffs.reset_state(&mut state.peak_state, y);
        let y = hp + self.satur_coeffs.reset_state(&mut state.satur_state, y - hp);
        let y = self.lp1_coeffs.reset_state(&mut state.lp1_state, y);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("drive_state");
            state.coeffs_reset_id = self.reset_id;
        }
        self.gain_coeffs.get_gain_cur() * y
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [DriveState],
        x0: &[f32],
        y0: Option<&mut [f32]>,
    ) {
        dsp_debug_assert!(states.len() == x0.len());
        match y0 {
            Some(y0) => {
                for ((state, &x), y) in states.iter_mut().zip(x0).zip(y0) {
                    *y = self.reset_state(state, x);
                }
            }
            None => {
                for (state, &x) in states.iter_mut().zip(x0) {
                    self.reset_state(state, x);
                }
            }
        }
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.hp2_coeffs.update_coeffs_ctrl();
        self.hs1_coeffs.update_coeffs_ctrl();
        self.peak_coeffs.update_coeffs_ctrl();
        self.satur_coeffs.update_coeffs_ctrl();
        self.lp1_coeffs.update_coeffs_ctrl();
        self.gain_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.hp2_coeffs.update_coeffs_audio();
        self.hs1_coeffs.update_coeffs_audio();
        self.peak_coeffs.update_coeffs_audio();
        self.satur_coeffs.update_coeffs_audio();
        self.lp1_coeffs.update_coeffs_audio();
        self.gain_coeffs.update_coeffs_audio();
    }

    /// Processes one sample.
    #[inline]
    pub fn process1(&self, state: &mut DriveState, x: f32) -> f32 {
        let (_, _, hp) = self.hp2_coeffs.process1(&mut state.hp2_state, 0.316 * x);
        let y = self.hs1_coeffs.process1(&mut state.hs1_state, hp);
        let y = self.peak_coeffs.process1(&mut state.peak_state, y);
        let y = hp + self.satur_coeffs.process1_comp(&mut state.satur_state, y - hp);
        let y = self.lp1_coeffs.process1(&mut state.lp1_state, y);
        self.gain_coeffs.process1(y)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut DriveState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(
        &mut self,
        states: &mut [DriveState],
        x: &[&[f32]],
        y: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == x.len() && states.len() == y.len());
        self.update_coeffs_ctrl();
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for (j, state) in states.iter_mut().enumerate() {
                y[j][i] = self.process1(state, x[j][i]);
            }
        }
    }

    /// Sets the drive amount. Valid range: `[0, 1]`, mapping to a
    /// `20·value` dB mid boost in front of the saturator.
    pub fn set_drive(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.peak_coeffs.set_peak_gain_db(20.0 * value);
    }

    /// Sets the tone control. Valid range: `[0, 1]`, mapping the output
    /// low-pass to `400 + 4600·value³` Hz.
    pub fn set_tone(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.lp1_coeffs
            .set_cutoff(400.0 + (5e3 - 400.0) * value * value * value);
    }

    /// Sets the output volume. Valid range: `[0, 1]`, applied as a cubic
    /// taper.
    pub fn set_volume(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.gain_coeffs.set_gain_lin(value * value * value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("drive_coeffs") {
                return false;
            }
        }
        self.hp2_coeffs.coeffs_is_valid()
            && self.hs1_coeffs.coeffs_is_valid()
            && self.peak_coeffs.coeffs_is_valid()
            && self.satur_coeffs.coeffs_is_valid()
            && self.lp1_coeffs.coeffs_is_valid()
            && self.gain_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &DriveState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("drive_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.hp2_coeffs.state_is_valid(&state.hp2_state)
            && self.hs1_coeffs.state_is_valid(&state.hs1_state)
            && self.peak_coeffs.state_is_valid(&state.peak_state)
            && self.satur_coeffs.state_is_valid(&state.satur_state)
            && self.lp1_coeffs.state_is_valid(&state.lp1_state)
    }
}

impl Default for DriveCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

//! Fuzz Pedal
//!
//! A vintage-fuzz chain: DC-blocking high-pass at 4 Hz, two cascaded
//! 2nd-order low-passes at 7 kHz (the dark input stage of the circuit), a
//! fuzz-controlled mid peak, a heavily biased saturator (the asymmetric
//! transistor stage that gives fuzz its ragged even harmonics), an output
//! high-pass at 30 Hz, and a volume gain.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::gain::GainCoeffs;
use crate::hp1::{Hp1Coeffs, Hp1State};
use crate::peak::{PeakCoeffs, PeakState};
use crate::satur::{SaturCoeffs, SaturState};
use crate::svf::{SvfCoeffs, SvfState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct FuzzCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    hp1_in_coeffs: Hp1Coeffs,
    lp2_coeffs: SvfCoeffs,
    peak_coeffs: PeakCoeffs,
    satur_coeffs: SaturCoeffs,
    hp1_out_coeffs: Hp1Coeffs,
    gain_coeffs: GainCoeffs,
}

/// Per-voice pedal memory. The two low-pass stages share coefficients but
/// keep separate filter memories.
#[derive(Debug, Clone, Default)]
pub struct FuzzState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    hp1_in_state: Hp1State,
    lp2_1_state: SvfState,
    lp2_2_state: SvfState,
    peak_state: PeakState,
    satur_state: SaturState,
    hp1_out_state: Hp1State,
}

impl FuzzState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FuzzCoeffs {
    /// Creates coefficients with default parameters: fuzz `0`, volume `1`.
    pub fn new() -> Self {
        let mut hp1_in_coeffs = Hp1Coeffs::new();
        let mut lp2_coeffs = SvfCoeffs::new();
        let mut peak_coeffs = PeakCoeffs::new();
        let mut satur_coeffs = SaturCoeffs::new();
        let mut hp1_out_coeffs = Hp1Coeffs::new();
        hp1_in_coeffs.set_cutoff(4.0);
        lp2_coeffs.set_cutoff(7e3);
        peak_coeffs.set_cutoff(500.0);
        peak_coeffs.set_bandwidth(6.6);
        satur_coeffs.set_bias(0.145);
        hp1_out_coeffs.set_cutoff(30.0);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("fuzz_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            hp1_in_coeffs,
            lp2_coeffs,
            peak_coeffs,
            satur_coeffs,
            hp1_out_coeffs,
            gain_coeffs: GainCoeffs::new(),
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.hp1_in_coeffs.set_sample_rate(sample_rate);
        self.lp2_coeffs.set_sample_rate(sample_rate);
        self.peak_coeffs.set_sample_rate(sample_rate);
        self.satur_coeffs.set_sample_rate(sample_rate);
        self.hp1_out_coeffs.set_sample_rate(sample_rate);
        self.gain_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.hp1_in_coeffs.reset_coeffs();
        self.lp2_coeffs.reset_coeffs();
        self.peak_coeffs.reset_coeffs();
        self.satur_coeffs.reset_coeffs();
        self.hp1_out_coeffs.reset_coeffs();
        self.gain_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// output.
    pub fn reset_state(&self, state: &mut FuzzState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let y = self.hp1_in_coeffs.reset_state(&mut state.hp1_in_state, x0);
        let (lp, _, _) = self.lp2_coeffs.reset_state(&mut state.lp2_1_state, y);
        let (lp, _, _) = self.lp2_coeffs.reset_state(&mut state.lp2_2_state, lp);
        let y = self.peak_coeffs.reset_state(&mut state.peak_state, lp);
        let y = self.satur_coeffs.reset_state(&mut state.satur_state, y);
        let y = self
            .hp1_out_coeffs
            .reset_state(&mut state.hp1_out_state, y);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("fuzz_state");
            state.coeffs_reset_id = self.reset_id;
        }
        self.gain_coeffs.get_gain_cur() * y
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [FuzzState],
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
        self.hp1_in_coeffs.update_coeffs_ctrl();
        self.lp2_coeffs.update_coeffs_ctrl();
        self.peak_coeffs.update_coeffs_ctrl();
        self.satur_coeffs.update_coeffs_ctrl();
        self.hp1_out_coeffs.update_coeffs_ctrl();
        self.gain_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.hp1_in_coeffs.update_coeffs_audio();
        self.lp2_coeffs.update_coeffs_audio();
        self.peak_coeffs.update_coeffs_audio();
        self.satur_coeffs.update_coeffs_audio();
        self.hp1_out_coeffs.update_coeffs_audio();
        self.gain_coeffs.update_coeffs_audio();
    }

    /// Processes one sample.
    #[inline]
    pub fn process1(&self, state: &mut FuzzState, x: f32) -> f32 {
        let y = self.hp1_in_coeffs.process1(&mut state.hp1_in_state, x);
        let (lp, _, _) = self.lp2_coeffs.process1(&mut state.lp2_1_state, y);
        let (lp, _, _) = self.lp2_coeffs.process1(&mut state.lp2_2_state, lp);
        let y = self.peak_coeffs.process1(&mut state.peak_state, lp);
        let y = self.satur_coeffs.process1(&mut state.satur_state, y);
        let y = self.hp1_out_coeffs.process1(&mut state.hp1_out_state, y);
        self.gain_coeffs.process1(y)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut FuzzState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [FuzzState], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the fuzz amount. Valid range: `[0, 1]`, mapping to a
    /// `30·value` dB mid boost in front of the saturator.
    pub fn set_fuzz(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.peak_coeffs.set_peak_gain_db(30.0 * value);
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
            if self.hash != crate::debug::hash_sdbm("fuzz_coeffs") {
                return false;
            }
        }
        self.hp1_in_coeffs.coeffs_is_valid()
            && self.lp2_coeffs.coeffs_is_valid()
            && self.peak_coeffs.coeffs_is_valid()
            && self.satur_coeffs.coeffs_is_valid()
            && self.hp1_out_coeffs.coeffs_is_valid()
            && self.gain_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &FuzzState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("fuzz_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.hp1_in_coeffs.state_is_valid(&state.hp1_in_state)
            && self.lp2_coeffs.state_is_valid(&state.lp2_1_state)
            && self.lp2_coeffs.state_is_valid(&state.lp2_2_state)
            && self.peak_coeffs.state_is_valid(&state.peak_state)
            && self.satur_coeffs.state_is_valid(&state.satur_state)
            && self.hp1_out_coeffs.state_is_valid(&state.hp1_out_state)
    }
}

impl Default for FuzzCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fuzz: f32) -> (FuzzCoeffs, FuzzState) {
        let mut c = FuzzCoeffs::new();
        c.set_fuzz(fuzz);
        c.set_volume(1.0);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = FuzzState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_dc_rejected() {
        let (c, mut s) = make(0.5);
        let y0 = c.reset_state(&mut s, 0.6);
        assert!(y0.abs() < 1e-4);
    }

    #[test]
    fn test_finite_on_program() {
        let (mut c, mut s) = make(1.0);
        let x: Vec<f32> = (0..8192)
            .map(|i| (core::f32::consts::TAU * 110.0 * i as f32 / 48000.0).sin())
            .collect();
        let mut y = vec![0.0f32; 8192];
        c.process(&mut s, &x, &mut y);
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_asymmetric_bias_makes_even_harmonics() {
        // biased saturation produces a 2nd harmonic that symmetric
        // clipping would not
        let fs = 48000.0;
        let f0 = 440.0;
        let (mut c, mut s) = make(1.0);
        let x: Vec<f32> = (0..16384)
            .map(|i| 0.5 * (core::f32::consts::TAU * f0 * i as f32 / fs).sin())
            .collect();
        let mut y = vec![0.0f32; 16384];
        c.process(&mut s, &x, &mut y);
        let probe = |mult: f32| {
            let w = core::f32::consts::TAU * mult * f0 / fs;
            let (mut re, mut im) = (0.0f32, 0.0f32);
            for (i, &v) in y[8192..].iter().enumerate() {
                re += v * (w * i as f32).cos();
                im += v * (w * i as f32).sin();
            }
            (re * re + im * im).sqrt()
        };
        let fundamental = probe(1.0);
        let second = probe(2.0);
        assert!(second > 0.01 * fundamental, "no even harmonics");
    }
}

//! Wah Pedal
//!
//! A resonant band-pass sweep: the band-pass output of an embedded
//! [`svf`](crate::svf) at Q = 9, with the pedal position mapping cutoff as
//! `400 + 1600·pos³` Hz. The cubic law concentrates travel in the low
//! mids, where the effect is most vocal.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::svf::{SvfCoeffs, SvfState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct WahCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    svf_coeffs: SvfCoeffs,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct WahState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    svf_state: SvfState,
}

impl WahState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WahCoeffs {
    /// Creates coefficients with default parameters: pedal at `0.5`
    /// (600 Hz), Q `9`.
    pub fn new() -> Self {
        let mut svf_coeffs = SvfCoeffs::new();
        svf_coeffs.set_cutoff(600.0);
        svf_coeffs.set_q(9.0);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("wah_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            svf_coeffs,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.svf_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.svf_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns `0` (the
    /// band-pass rejects DC).
    pub fn reset_state(&self, state: &mut WahState, x0: f32) -> f32 {
        let (_, bp, _) = self.svf_coeffs.reset_state(&mut state.svf_state, x0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("wah_state");
            state.coeffs_reset_id = self.reset_id;
        }
        bp
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [WahState],
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
        self.svf_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.svf_coeffs.update_coeffs_audio();
    }

    /// Filters one sample.
    #[inline]
    pub fn process1(&self, state: &mut WahState, x: f32) -> f32 {
        let (_, bp, _) = self.svf_coeffs.process1(&mut state.svf_state, x);
        bp
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut WahState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [WahState], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the pedal position. Valid range: `[0, 1]` (heel to toe).
    pub fn set_wah(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.svf_coeffs
            .set_cutoff(400.0 + (2e3 - 400.0) * value * value * value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("wah_coeffs") {
                return false;
            }
        }
        self.svf_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &WahState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("wah_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.svf_coeffs.state_is_valid(&state.svf_state)
    }
}

impl Default for WahCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(pos: f32) -> (WahCoeffs, WahState) {
        let mut c = WahCoeffs::new();
        c.set_wah(pos);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = WahState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_dc_rejection() {
        let (c, mut s) = make(0.5);
        assert_eq!(c.reset_state(&mut s, 0.7), 0.0);
    }

    #[test]
    fn test_resonant_peak_moves_with_pedal() {
        let fs = 48000.0;
        let probe = |pos: f32, freq: f32| {
            let (mut c, mut s) = make(pos);
            let x: Vec<f32> = (0..8192)
                .map(|i| (core::f32::consts::TAU * freq * i as f32 / fs).sin())
                .collect();
            let mut y = vec![0.0f32; 8192];
            c.process(&mut s, &x, &mut y);
            let rms = |v: &[f32]| (v.iter().map(|a| a * a).sum::<f32>() / v.len() as f32).sqrt();
            rms(&y[4096..]) / rms(&x[4096..])
        };
        // heel: 400 Hz resonance; toe: 2 kHz
        assert!(probe(0.0, 400.0) > 3.0);
        assert!(probe(1.0, 2000.0) > 3.0);
        assert!(probe(0.0, 2000.0) < 0.5);
    }

    #[test]
    fn test_finite_under_sweep() {
        let fs = 48000.0;
        let (mut c, mut s) = make(0.0);
        let x: Vec<f32> = (0..4096)
            .map(|i| (core::f32::consts::TAU * 440.0 * i as f32 / fs).sin())
            .collect();
        let mut y = vec![0.0f32; 4096];
        for (blk, chunk) in x.chunks(256).enumerate() {
            c.set_wah(blk as f32 / 15.0);
            let y_blk = &mut y[blk * 256..(blk + 1) * 256];
            c.process(&mut s, chunk, y_blk);
        }
        assert!(y.iter().all(|v| v.is_finite()));
    }
}

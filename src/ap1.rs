//! First-Order Allpass Filter
//!
//! `y = 2·lp1(x) − x`: unity magnitude at every frequency, with phase
//! rotating from 0 at DC to −π at Nyquist, crossing −π/2 at the cutoff.
//! Cascades of these are the backbone of the [`phaser`](crate::phaser).

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::lp1::{Lp1Coeffs, Lp1State};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct Ap1Coeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    lp1_coeffs: Lp1Coeffs,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct Ap1State {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    lp1_state: Lp1State,
}

impl Ap1State {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ap1Coeffs {
    /// Creates coefficients with default parameters (cutoff `1e3` Hz).
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("ap1_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            lp1_coeffs: Lp1Coeffs::new(),
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.lp1_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.lp1_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns `x0` (unity
    /// DC gain).
    pub fn reset_state(&self, state: &mut Ap1State, x0: f32) -> f32 {
        let lp = self.lp1_coeffs.reset_state(&mut state.lp1_state, x0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("ap1_state");
            state.coeffs_reset_id = self.reset_id;
        }
        lp + lp - x0
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [Ap1State],
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
        self.lp1_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.lp1_coeffs.update_coeffs_audio();
    }

    /// Filters one sample.
    #[inline]
    pub fn process1(&self, state: &mut Ap1State, x: f32) -> f32 {
        let lp = self.lp1_coeffs.process1(&mut state.lp1_state, x);
        lp + lp - x
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut Ap1State, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [Ap1State], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the cutoff (phase-crossover) frequency (Hz).
    pub fn set_cutoff(&mut self, value: f32) {
        self.lp1_coeffs.set_cutoff(value);
    }

    /// Chooses whether the prewarp frequency tracks the cutoff.
    pub fn set_prewarp_at_cutoff(&mut self, value: bool) {
        self.lp1_coeffs.set_prewarp_at_cutoff(value);
    }

    /// Sets the prewarp frequency (Hz).
    pub fn set_prewarp_freq(&mut self, value: f32) {
        self.lp1_coeffs.set_prewarp_freq(value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("ap1_coeffs") {
                return false;
            }
        }
        self.lp1_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &Ap1State) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("ap1_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.lp1_coeffs.state_is_valid(&state.lp1_state)
    }
}

impl Default for Ap1Coeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fs: f32, cutoff: f32) -> (Ap1Coeffs, Ap1State) {
        let mut c = Ap1Coeffs::new();
        c.set_cutoff(cutoff);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = Ap1State::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_dc_identity() {
        let (c, mut s) = make(48000.0, 1000.0);
        assert_eq!(c.reset_state(&mut s, 0.4), 0.4);
        let y = c.process1(&mut s, 0.4);
        assert!((y - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_unity_magnitude() {
        // allpass: output RMS equals input RMS at any frequency
        let fs = 48000.0;
        for freq in [100.0, 1000.0, 10000.0] {
            let (mut c, mut s) = make(fs, 1000.0);
            let x: Vec<f32> = (0..8192)
                .map(|i| (core::f32::consts::TAU * freq * i as f32 / fs).sin())
                .collect();
            let mut y = vec![0.0f32; 8192];
            c.process(&mut s, &x, &mut y);
            let rms = |v: &[f32]| (v.iter().map(|a| a * a).sum::<f32>() / v.len() as f32).sqrt();
            let g = rms(&y[4096..]) / rms(&x[4096..]);
            assert!((g - 1.0).abs() < 0.02, "gain {g} at {freq} Hz");
        }
    }

    #[test]
    fn test_phase_inversion_at_high_freq() {
        // far above cutoff the allpass approaches -x
        let (c, mut s) = make(48000.0, 10.0);
        c.reset_state(&mut s, 0.0);
        let mut y = 0.0;
        for i in 0..64 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 }; // Nyquist
            y = c.process1(&mut s, x);
        }
        // at Nyquist with low cutoff: y ≈ -x, and x was -1 on the last sample
        assert!(y > 0.9);
    }
}

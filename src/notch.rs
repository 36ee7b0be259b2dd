//! Second-Order Notch Filter
//!
//! Rejects a narrow band around the cutoff while passing DC and Nyquist:
//! the sum of the low-pass and high-pass outputs of an embedded
//! [`svf`](crate::svf), `y = lp + hp`.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::svf::{SvfCoeffs, SvfState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct NotchCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    svf_coeffs: SvfCoeffs,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct NotchState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    svf_state: SvfState,
}

impl NotchState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotchCoeffs {
    /// Creates coefficients with default parameters: cutoff `1e3` Hz,
    /// Q `0.5`.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("notch_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            svf_coeffs: SvfCoeffs::new(),
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

    /// Seeds `state` as if `x0` had been fed forever; returns `x0` (unity
    /// DC gain).
    pub fn reset_state(&self, state: &mut NotchState, x0: f32) -> f32 {
        let (lp, _, hp) = self.svf_coeffs.reset_state(&mut state.svf_state, x0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("notch_state");
            state.coeffs_reset_id = self.reset_id;
        }
        lp + hp
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [NotchState],
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
    pub fn process1(&self, state: &mut NotchState, x: f32) -> f32 {
        let (lp, _, hp) = self.svf_coeffs.process1(&mut state.svf_state, x);
        lp + hp
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut NotchState, x: &[f32], y: &mut [f32]) {
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
        states: &mut [NotchState],
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

    /// Sets the center (rejection) frequency (Hz).
    pub fn set_cutoff(&mut self, value: f32) {
        self.svf_coeffs.set_cutoff(value);
    }

    /// Sets the quality factor (rejection bandwidth).
    pub fn set_q(&mut self, value: f32) {
        self.svf_coeffs.set_q(value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("notch_coeffs") {
                return false;
            }
        }
        self.svf_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &NotchState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("notch_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.svf_coeffs.state_is_valid(&state.svf_state)
    }
}

impl Default for NotchCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fs: f32, cutoff: f32, q: f32) -> (NotchCoeffs, NotchState) {
        let mut c = NotchCoeffs::new();
        c.set_cutoff(cutoff);
        c.set_q(q);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = NotchState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_dc_unity() {
        let (c, mut s) = make(48000.0, 1000.0, 1.0);
        assert_eq!(c.reset_state(&mut s, 0.5), 0.5);
        let y = c.process1(&mut s, 0.5);
        assert!((y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejection_at_center() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 1000.0, 1.0);
        let x: Vec<f32> = (0..8192)
            .map(|i| (core::f32::consts::TAU * 1000.0 * i as f32 / fs).sin())
            .collect();
        let mut y = vec![0.0f32; 8192];
        c.process(&mut s, &x, &mut y);
        let rms = |v: &[f32]| (v.iter().map(|a| a * a).sum::<f32>() / v.len() as f32).sqrt();
        assert!(rms(&y[4096..]) < 0.05);
    }

    #[test]
    fn test_passes_far_from_center() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 1000.0, 1.0);
        let x: Vec<f32> = (0..8192)
            .map(|i| (core::f32::consts::TAU * 100.0 * i as f32 / fs).sin())
            .collect();
        let mut y = vec![0.0f32; 8192];
        c.process(&mut s, &x, &mut y);
        let rms = |v: &[f32]| (v.iter().map(|a| a * a).sum::<f32>() / v.len() as f32).sqrt();
        assert!(rms(&y[4096..]) / rms(&x[4096..]) > 0.95);
    }
}

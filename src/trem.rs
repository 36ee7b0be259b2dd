//! Tremolo
//!
//! Amplitude modulation by an internal low-frequency sine: a
//! [`phase_gen`](crate::phase_gen) drives [`osc_sin`](crate::osc_sin) and
//! the input is ring-modulated against the carrier `1 + sin`, so at full
//! amount the level swings between 0 and 2× and at amount 0 the input
//! passes unchanged. The oscillator phase is per-voice state; rate and
//! amount are shared.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::osc_sin;
use crate::phase_gen::{PhaseGenCoeffs, PhaseGenState};
use crate::ring_mod::RingModCoeffs;

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct TremCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    phase_gen_coeffs: PhaseGenCoeffs,
    ring_mod_coeffs: RingModCoeffs,
}

/// Per-voice oscillator memory.
#[derive(Debug, Clone, Default)]
pub struct TremState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    phase_gen_state: PhaseGenState,
}

impl TremState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TremCoeffs {
    /// Creates coefficients with default parameters: rate `1` Hz, amount
    /// `1` (full depth).
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("trem_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            phase_gen_coeffs: PhaseGenCoeffs::new(),
            ring_mod_coeffs: RingModCoeffs::new(),
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.phase_gen_coeffs.set_sample_rate(sample_rate);
        self.ring_mod_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.phase_gen_coeffs.reset_coeffs();
        self.ring_mod_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` with the oscillator at phase 0; returns the
    /// corresponding initial output.
    pub fn reset_state(&self, state: &mut TremState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let (p, _) = self
            .phase_gen_coeffs
            .reset_state(&mut state.phase_gen_state, 0.0);
        let c = osc_sin::process1(p);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("trem_state");
            state.coeffs_reset_id = self.reset_id;
        }
        self.ring_mod_coeffs.process1(x0, 1.0 + c)
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [TremState],
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
        self.phase_gen_coeffs.update_coeffs_ctrl();
        self.ring_mod_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.phase_gen_coeffs.update_coeffs_audio();
        self.ring_mod_coeffs.update_coeffs_audio();
    }

    /// Processes one sample.
    #[inline]
    pub fn process1(&self, state: &mut TremState, x: f32) -> f32 {
        let (p, _) = self.phase_gen_coeffs.process1(&mut state.phase_gen_state);
        let c = osc_sin::process1(p);
        self.ring_mod_coeffs.process1(x, 1.0 + c)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut TremState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [TremState], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the modulation rate (Hz).
    pub fn set_rate(&mut self, value: f32) {
        self.phase_gen_coeffs.set_frequency(value);
    }

    /// Sets the modulation amount. Valid range: `[-1, 1]`.
    pub fn set_amount(&mut self, value: f32) {
        self.ring_mod_coeffs.set_amount(value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("trem_coeffs") {
                return false;
            }
        }
        self.phase_gen_coeffs.coeffs_is_valid() && self.ring_mod_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &TremState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("trem_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.phase_gen_coeffs.state_is_valid(&state.phase_gen_state)
    }
}

impl Default for TremCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(rate: f32, amount: f32) -> (TremCoeffs, TremState) {
        let mut c = TremCoeffs::new();
        c.set_rate(rate);
        c.set_amount(amount);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = TremState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_amount_zero_is_identity() {
        let (mut c, mut s) = make(5.0, 0.0);
        let x: Vec<f32> = (0..512).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut y = vec![0.0f32; 512];
        c.process(&mut s, &x, &mut y);
        for i in 0..512 {
            assert!((y[i] - x[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_full_depth_level_swings() {
        // on a DC input of 1, full-depth tremolo outputs 1 + sin
        let (mut c, mut s) = make(100.0, 1.0);
        let x = vec![1.0f32; 480];
        let mut y = vec![0.0f32; 480];
        c.process(&mut s, &x, &mut y);
        let max = y.iter().cloned().fold(f32::MIN, f32::max);
        let min = y.iter().cloned().fold(f32::MAX, f32::min);
        assert!(max > 1.9, "max {max}");
        assert!(min < 0.1, "min {min}");
    }

    #[test]
    fn test_finite() {
        let (mut c, mut s) = make(7.0, 0.7);
        let x: Vec<f32> = (0..4096).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut y = vec![0.0f32; 4096];
        c.process(&mut s, &x, &mut y);
        assert!(y.iter().all(|v| v.is_finite()));
    }
}

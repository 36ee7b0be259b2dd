//! First-Order High-Pass Filter
//!
//! The complement of [`lp1`](crate::lp1): `y = x − lp1(x)`, giving a
//! 6 dB/oct high-pass with zero DC gain and the same smoothed cutoff and
//! prewarp controls as the embedded low-pass.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::lp1::{Lp1Coeffs, Lp1State};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct Hp1Coeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    lp1_coeffs: Lp1Coeffs,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct Hp1State {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    lp1_state: Lp1State,
}

impl Hp1State {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hp1Coeffs {
    /// Creates coefficients with default parameters (cutoff `1e3` Hz).
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("hp1_coeffs"),
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

    /// Seeds `state` as if `x0` had been fed forever; returns `0` (zero DC
    /// gain).
    pub fn reset_state(&self, state: &mut Hp1State, x0: f32) -> f32 {
        let lp = self.lp1_coeffs.reset_state(&mut state.lp1_state, x0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("hp1_state");
            state.coeffs_reset_id = self.reset_id;
        }
        x0 - lp
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [Hp1State],
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
    pub fn process1(&self, state: &mut Hp1State, x: f32) -> f32 {
        x - self.lp1_coeffs.process1(&mut state.lp1_state, x)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut Hp1State, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [Hp1State], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the cutoff frequency (Hz). Valid range: `[1e-6, 1e12]`.
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
            if self.hash != crate::debug::hash_sdbm("hp1_coeffs") {
                return false;
            }
        }
        self.lp1_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &Hp1State) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("hp1_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.lp1_coeffs.state_is_valid(&state.lp1_state)
    }
}

impl Default for Hp1Coeffs {
    fn default() -> Self {
        Self::new()
    }
}

//! First-Order Multimode Filter
//!
//! Weighted sum of the input and its first-order low-pass:
//! `y = coeff_x·x + coeff_lp·lp1(x)`. Choosing the two gains turns this one
//! structure into a low-pass, high-pass, low shelf, high shelf, or allpass;
//! [`hs1`](crate::hs1) and [`ls1`](crate::ls1) are thin parameterizations
//! of it. Both gains are smoothed.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::gain::GainCoeffs;
use crate::lp1::{Lp1Coeffs, Lp1State};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct Mm1Coeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    lp1_coeffs: Lp1Coeffs,
    gain_x_coeffs: GainCoeffs,
    gain_lp_coeffs: GainCoeffs,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct Mm1State {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    lp1_state: Lp1State,
}

impl Mm1State {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Mm1Coeffs {
    /// Creates coefficients with default parameters: cutoff `1e3` Hz,
    /// `coeff_x = 1`, `coeff_lp = 0` (identity), gain smoothing `0.005` s.
    pub fn new() -> Self {
        let mut gain_x_coeffs = GainCoeffs::new();
        let mut gain_lp_coeffs = GainCoeffs::new();
        gain_x_coeffs.set_smooth_tau(0.005);
        gain_lp_coeffs.set_smooth_tau(0.005);
        gain_x_coeffs.set_gain_lin(1.0);
        gain_lp_coeffs.set_gain_lin(0.0);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("mm1_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            lp1_coeffs: Lp1Coeffs::new(),
            gain_x_coeffs,
            gain_lp_coeffs,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.lp1_coeffs.set_sample_rate(sample_rate);
        self.gain_x_coeffs.set_sample_rate(sample_rate);
        self.gain_lp_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.lp1_coeffs.reset_coeffs();
        self.gain_x_coeffs.reset_coeffs();
        self.gain_lp_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// output.
    pub fn reset_state(&self, state: &mut Mm1State, x0: f32) -> f32 {
        let lp = self.lp1_coeffs.reset_state(&mut state.lp1_state, x0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("mm1_state");
            state.coeffs_reset_id = self.reset_id;
        }
        self.gain_x_coeffs.get_gain_cur() * x0 + self.gain_lp_coeffs.get_gain_cur() * lp
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [Mm1State],
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
        self.gain_x_coeffs.update_coeffs_ctrl();
        self.gain_lp_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.lp1_coeffs.update_coeffs_audio();
        self.gain_x_coeffs.update_coeffs_audio();
        self.gain_lp_coeffs.update_coeffs_audio();
    }

    /// Filters one sample.
    #[inline]
    pub fn process1(&self, state: &mut Mm1State, x: f32) -> f32 {
        let lp = self.lp1_coeffs.process1(&mut state.lp1_state, x);
        self.gain_x_coeffs.process1(x) + self.gain_lp_coeffs.process1(lp)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut Mm1State, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [Mm1State], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the cutoff frequency (Hz) of the low-pass path.
    pub fn set_cutoff(&mut self, value: f32) {
        self.lp1_coeffs.set_cutoff(value);
    }

    /// Sets the input-path gain.
    pub fn set_coeff_x(&mut self, value: f32) {
        self.gain_x_coeffs.set_gain_lin(value);
    }

    /// Sets the low-pass-path gain.
    pub fn set_coeff_lp(&mut self, value: f32) {
        self.gain_lp_coeffs.set_gain_lin(value);
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
            if self.hash != crate::debug::hash_sdbm("mm1_coeffs") {
                return false;
            }
        }
        self.lp1_coeffs.coeffs_is_valid()
            && self.gain_x_coeffs.coeffs_is_valid()
            && self.gain_lp_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &Mm1State) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("mm1_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.lp1_coeffs.state_is_valid(&state.lp1_state)
    }
}

impl Default for Mm1Coeffs {
    fn default() -> Self {
        Self::new()
    }
}

//! Phaser
//!
//! Four cascaded first-order allpass stages whose common cutoff is swept
//! by an internal low-frequency sine, summed back with the dry input:
//! `y = x + ap⁴(x)`. The sweep is exponential around the center frequency,
//! `cutoff = center·2^(amount·sin)`. All four stages share one
//! [`ap1`](crate::ap1) coefficient set — the per-sample modulation is paid
//! once, not four times — and the modulation oscillator lives in the
//! coefficients so every voice hears the same sweep.

use crate::ap1::{Ap1Coeffs, Ap1State};
use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::osc_sin;
use crate::phase_gen::{PhaseGenCoeffs, PhaseGenState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct PhaserCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    phase_gen_coeffs: PhaseGenCoeffs,
    phase_gen_state: PhaseGenState,
    ap1_coeffs: Ap1Coeffs,

    // Parameters
    center: f32,
    amount: f32,
}

/// Per-voice filter memory: the four allpass stages.
#[derive(Debug, Clone, Default)]
pub struct PhaserState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    ap1_state: [Ap1State; 4],
}

impl PhaserState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhaserCoeffs {
    /// Creates coefficients with default parameters: rate `1` Hz, center
    /// `1e3` Hz, amount `1` octave.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("phaser_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            phase_gen_coeffs: PhaseGenCoeffs::new(),
            phase_gen_state: PhaseGenState::new(),
            ap1_coeffs: Ap1Coeffs::new(),
            center: 1e3,
            amount: 1.0,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.phase_gen_coeffs.set_sample_rate(sample_rate);
        self.ap1_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values, restarts the modulation
    /// oscillator, and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.phase_gen_coeffs.reset_coeffs();
        self.phase_gen_coeffs
            .reset_state(&mut self.phase_gen_state, 0.0);
        self.ap1_coeffs.set_cutoff(self.center);
        self.ap1_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// output `2·x0` (each allpass is unity at DC, plus the dry path).
    pub fn reset_state(&self, state: &mut PhaserState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let mut y = self.ap1_coeffs.reset_state(&mut state.ap1_state[0], x0);
        y = self.ap1_coeffs.reset_state(&mut state.ap1_state[1], y);
        y = self.ap1_coeffs.reset_state(&mut state.ap1_state[2], y);
        y = x0 + self.ap1_coeffs.reset_state(&mut state.ap1_state[3], y);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("phaser_state");
            state.coeffs_reset_id = self.reset_id;
        }
        y
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [PhaserState],
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
    }

    /// Audio-rate update: advances the sweep oscillator and retunes the
    /// shared allpass.
    pub fn update_coeffs_audio(&mut self) {
        self.phase_gen_coeffs.update_coeffs_audio();
        let (p, _) = self.phase_gen_coeffs.process1(&mut self.phase_gen_state);
        let m = self.amount * osc_sin::process1(p);
        self.ap1_coeffs.set_cutoff(self.center * math::pow2(m));
        self.ap1_coeffs.update_coeffs_ctrl();
        self.ap1_coeffs.update_coeffs_audio();
    }

    /// Processes one sample.
    #[inline]
    pub fn process1(&self, state: &mut PhaserState, x: f32) -> f32 {
        let mut y = self.ap1_coeffs.process1(&mut state.ap1_state[0], x);
        y = self.ap1_coeffs.process1(&mut state.ap1_state[1], y);
        y = self.ap1_coeffs.process1(&mut state.ap1_state[2], y);
        x + self.ap1_coeffs.process1(&mut state.ap1_state[3], y)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut PhaserState, x: &[f32], y: &mut [f32]) {
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
        states: &mut [PhaserState],
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

    /// Sets the modulation rate (Hz).
    pub fn set_rate(&mut self, value: f32) {
        self.phase_gen_coeffs.set_frequency(value);
    }

    /// Sets the sweep center frequency (Hz). Valid range: `[1e-6, 1e12]`,
    /// with `center·2^±amount` staying inside it.
    pub fn set_center(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e12).contains(&value));
        self.center = value;
    }

    /// Sets the sweep amount in octaves. Valid range: `[0, 10]`.
    pub fn set_amount(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=10.0).contains(&value));
        self.amount = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("phaser_coeffs") {
                return false;
            }
        }
        if !(self.center.is_finite() && (1e-6..=1e12).contains(&self.center)) {
            return false;
        }
        if !(self.amount.is_finite() && (0.0..=10.0).contains(&self.amount)) {
            return false;
        }
        self.phase_gen_coeffs.coeffs_is_valid() && self.ap1_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &PhaserState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("phaser_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        state
            .ap1_state
            .iter()
            .all(|s| self.ap1_coeffs.state_is_valid(s))
    }
}

impl Default for PhaserCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

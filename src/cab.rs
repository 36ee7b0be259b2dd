//! Cabinet Simulator
//!
//! A lightweight guitar/bass cabinet voicing built from SVF sections: a
//! low-pass then high-pass chain bounds the passband, and two parallel
//! band-passes (one at each band edge) are mixed with fixed gains on top of
//! a scaled direct path, approximating the body resonance and presence
//! bump of a real cab.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::gain::GainCoeffs;
use crate::svf::{SvfCoeffs, SvfState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct CabCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    lp_coeffs: SvfCoeffs,
    hp_coeffs: SvfCoeffs,
    bpl_coeffs: SvfCoeffs,
    bph_coeffs: SvfCoeffs,
    gain_bpl_coeffs: GainCoeffs,
    gain_bph_coeffs: GainCoeffs,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct CabState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    lp_state: SvfState,
    hp_state: SvfState,
    bpl_state: SvfState,
    bph_state: SvfState,
}

impl CabState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CabCoeffs {
    /// Creates coefficients with default parameters: low edge 100 Hz,
    /// high edge 4 kHz, tone centered.
    pub fn new() -> Self {
        let mut lp_coeffs = SvfCoeffs::new();
        let mut hp_coeffs = SvfCoeffs::new();
        let mut bpl_coeffs = SvfCoeffs::new();
        let mut bph_coeffs = SvfCoeffs::new();
        let mut gain_bpl_coeffs = GainCoeffs::new();
        let mut gain_bph_coeffs = GainCoeffs::new();
        lp_coeffs.set_cutoff(4e3);
        hp_coeffs.set_cutoff(100.0);
        bpl_coeffs.set_cutoff(100.0);
        bph_coeffs.set_cutoff(4e3);
        gain_bpl_coeffs.set_gain_lin(2.25);
        gain_bph_coeffs.set_gain_lin(3.75);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("cab_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            lp_coeffs,
            hp_coeffs,
            bpl_coeffs,
            bph_coeffs,
            gain_bpl_coeffs,
            gain_bph_coeffs,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.lp_coeffs.set_sample_rate(sample_rate);
        self.hp_coeffs.set_sample_rate(sample_rate);
        self.bpl_coeffs.set_sample_rate(sample_rate);
        self.bph_coeffs.set_sample_rate(sample_rate);
        self.gain_bpl_coeffs.set_sample_rate(sample_rate);
        self.gain_bph_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.lp_coeffs.reset_coeffs();
        self.hp_coeffs.reset_coeffs();
        self.bpl_coeffs.reset_coeffs();
        self.bph_coeffs.reset_coeffs();
        self.gain_bpl_coeffs.reset_coeffs();
        self.gain_bph_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// output (`0`: the high-pass chain rejects DC).
    pub fn reset_state(&self, state: &mut CabState, x0: f32) -> f32 {
        let (lp, _, _) = self.lp_coeffs.reset_state(&mut state.lp_state, x0);
        let (_, _, hp) = self.hp_coeffs.reset_state(&mut state.hp_state, lp);
        let (_, bpl, _) = self.bpl_coeffs.reset_state(&mut state.bpl_state, hp);
        let (_, bph, _) = self.bph_coeffs.reset_state(&mut state.bph_state, hp);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("cab_state");
            state.coeffs_reset_id = self.reset_id;
        }
        self.gain_bpl_coeffs.get_gain_cur() * bpl
            + self.gain_bph_coeffs.get_gain_cur() * bph
            + 0.45 * hp
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [CabState],
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
        self.lp_coeffs.update_coeffs_ctrl();
        self.hp_coeffs.update_coeffs_ctrl();
        self.bpl_coeffs.update_coeffs_ctrl();
        self.bph_coeffs.update_coeffs_ctrl();
        self.gain_bpl_coeffs.update_coeffs_ctrl();
        self.gain_bph_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.lp_coeffs.update_coeffs_audio();
        self.hp_coeffs.update_coeffs_audio();
        self.bpl_coeffs.update_coeffs_audio();
        self.bph_coeffs.update_coeffs_audio();
        self.gain_bpl_coeffs.update_coeffs_audio();
        self.gain_bph_coeffs.update_coeffs_audio();
    }

    /// Filters one sample.
    #[inline]
    pub fn process1(&self, state: &mut CabState, x: f32) -> f32 {
        let (lp, _, _) = self.lp_coeffs.process1(&mut state.lp_state, x);
        let (_, _, hp) = self.hp_coeffs.process1(&mut state.hp_state, lp);
        let y = hp;
        let (_, bpl, _) = self.bpl_coeffs.process1(&mut state.bpl_state, y);
        let (_, bph, _) = self.bph_coeffs.process1(&mut state.bph_state, y);
        self.gain_bpl_coeffs.process1(bpl) + self.gain_bph_coeffs.process1(bph) + 0.45 * y
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut CabState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [CabState], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the low band edge. Valid range: `[0, 1]`, mapping to
    /// `50 + v·(50 + 100·v)` Hz for the high-pass and low band-pass.
    pub fn set_cutoff_low(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        let f = 50.0 + value * (50.0 + 100.0 * value);
        self.hp_coeffs.set_cutoff(f);
        self.bpl_coeffs.set_cutoff(f);
    }

    /// Sets the high band edge. Valid range: `[0, 1]`, mapping to
    /// `2e3 + v·(2e3 + 4e3·v)` Hz for the low-pass and high band-pass.
    pub fn set_cutoff_high(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        let f = 2e3 + value * (2e3 + 4e3 * value);
        self.lp_coeffs.set_cutoff(f);
        self.bph_coeffs.set_cutoff(f);
    }

    /// Sets the tone balance. Valid range: `[0, 1]`; crossfades the two
    /// band-pass gains (dark to bright) around their centered defaults.
    pub fn set_tone(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.gain_bpl_coeffs.set_gain_lin(4.5 * (1.0 - value));
        self.gain_bph_coeffs.set_gain_lin(7.5 * value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("cab_coeffs") {
                return false;
            }
        }
        self.lp_coeffs.coeffs_is_valid()
            && self.hp_coeffs.coeffs_is_valid()
            && self.bpl_coeffs.coeffs_is_valid()
            && self.bph_coeffs.coeffs_is_valid()
            && self.gain_bpl_coeffs.coeffs_is_valid()
            && self.gain_bph_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &CabState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("cab_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.lp_coeffs.state_is_valid(&state.lp_state)
            && self.hp_coeffs.state_is_valid(&state.hp_state)
            && self.bpl_coeffs.state_is_valid(&state.bpl_state)
            && self.bph_coeffs.state_is_valid(&state.bph_state)
    }
}

impl Default for CabCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

//! First-Order High Shelf Filter
//!
//! Boosts or cuts everything above the cutoff by a settable gain, leaving
//! DC untouched. Implemented on [`mm1`](crate::mm1) with the mapping
//!
//! ```text
//! mm1 cutoff   = cutoff·√G
//! mm1 coeff_x  = G
//! mm1 coeff_lp = 1 − G
//! ```
//!
//! where `G` is the linear high-frequency gain; the √G cutoff shift puts
//! the half-gain point of the shelf at the named cutoff.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::mm1::{Mm1Coeffs, Mm1State};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct Hs1Coeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    mm1_coeffs: Mm1Coeffs,

    // Parameters
    cutoff: f32,
    prewarp_k: f32,
    prewarp_freq: f32,
    high_gain: f32,
    update: bool,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct Hs1State {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    mm1_state: Mm1State,
}

impl Hs1State {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hs1Coeffs {
    /// Creates coefficients with default parameters: cutoff `1e3` Hz,
    /// high gain `1` (identity), prewarp at cutoff.
    pub fn new() -> Self {
        let mut mm1_coeffs = Mm1Coeffs::new();
        mm1_coeffs.set_prewarp_at_cutoff(false);
        mm1_coeffs.set_coeff_x(1.0);
        mm1_coeffs.set_coeff_lp(0.0);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("hs1_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            mm1_coeffs,
            cutoff: 1e3,
            prewarp_k: 1.0,
            prewarp_freq: 1e3,
            high_gain: 1.0,
            update: true,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.mm1_coeffs.set_sample_rate(sample_rate);
    }

    fn update_mm1_params(&mut self) {
        self.mm1_coeffs.set_prewarp_freq(
            self.prewarp_freq + self.prewarp_k * (self.cutoff - self.prewarp_freq),
        );
        if self.update {
            self.mm1_coeffs
                .set_cutoff(self.cutoff * math::sqrt(self.high_gain));
            self.mm1_coeffs.set_coeff_x(self.high_gain);
            self.mm1_coeffs.set_coeff_lp(1.0 - self.high_gain);
            self.update = false;
        }
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.update = true;
        self.update_mm1_params();
        self.mm1_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns `x0` (unity
    /// DC gain).
    pub fn reset_state(&self, state: &mut Hs1State, x0: f32) -> f32 {
        let y = self.mm1_coeffs.reset_state(&mut state.mm1_state, x0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("hs1_state");
            state.coeffs_reset_id = self.reset_id;
        }
        y
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [Hs1State],
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

    /// Control-rate update: pushes any pending parameter mapping into the
    /// embedded multimode filter.
    pub fn update_coeffs_ctrl(&mut self) {
        self.update_mm1_params();
        self.mm1_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.mm1_coeffs.update_coeffs_audio();
    }

    /// Filters one sample.
    #[inline]
    pub fn process1(&self, state: &mut Hs1State, x: f32) -> f32 {
        self.mm1_coeffs.process1(&mut state.mm1_state, x)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut Hs1State, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [Hs1State], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the cutoff frequency (Hz). `cutoff·√high_gain` must stay in
    /// `[1e-6, 1e12]`.
    pub fn set_cutoff(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && value > 0.0);
        if value != self.cutoff {
            self.cutoff = value;
            self.update = true;
        }
    }

    /// Chooses whether the prewarp frequency tracks the cutoff (default
    /// `true`).
    pub fn set_prewarp_at_cutoff(&mut self, value: bool) {
        self.prewarp_k = if value { 1.0 } else { 0.0 };
    }

    /// Sets the prewarp frequency (Hz), used when prewarp-at-cutoff is
    /// disabled.
    pub fn set_prewarp_freq(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && value > 0.0);
        self.prewarp_freq = value;
    }

    /// Sets the high-frequency gain as a linear factor. Must be finite and
    /// non-negative.
    pub fn set_high_gain_lin(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && value >= 0.0);
        if value != self.high_gain {
            self.high_gain = value;
            self.update = true;
        }
    }

    /// Sets the high-frequency gain in dB.
    pub fn set_high_gain_db(&mut self, value: f32) {
        dsp_debug_assert!(!value.is_nan());
        self.set_high_gain_lin(math::db2lin(value));
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("hs1_coeffs") {
                return false;
            }
        }
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return false;
        }
        if !(self.high_gain.is_finite() && self.high_gain >= 0.0) {
            return false;
        }
        self.mm1_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &Hs1State) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("hs1_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.mm1_coeffs.state_is_valid(&state.mm1_state)
    }
}

impl Default for Hs1Coeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fs: f32, cutoff: f32, gain_db: f32) -> (Hs1Coeffs, Hs1State) {
        let mut c = Hs1Coeffs::new();
        c.set_cutoff(cutoff);
        c.set_high_gain_db(gain_db);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = Hs1State::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    fn band_gain(c: &mut Hs1Coeffs, s: &mut Hs1State, freq: f32, fs: f32) -> f32 {
        let x: Vec<f32> = (0..16384)
            .map(|i| (core::f32::consts::TAU * freq * i as f32 / fs).sin())
            .collect();
        let mut y = vec![0.0f32; 16384];
        c.process(s, &x, &mut y);
        let rms = |v: &[f32]| (v.iter().map(|a| a * a).sum::<f32>() / v.len() as f32).sqrt();
        rms(&y[8192..]) / rms(&x[8192..])
    }

    #[test]
    fn test_dc_unity() {
        let (c, mut s) = make(48000.0, 1000.0, 12.0);
        assert!((c.reset_state(&mut s, 0.5) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_high_boost() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 500.0, 12.0);
        let g = band_gain(&mut c, &mut s, 10000.0, fs);
        let db = 20.0 * g.log10();
        assert!((db - 12.0).abs() < 1.0, "shelf gain {db} dB");
    }

    #[test]
    fn test_high_cut() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 500.0, -12.0);
        let g = band_gain(&mut c, &mut s, 10000.0, fs);
        let db = 20.0 * g.log10();
        assert!((db + 12.0).abs() < 1.0, "shelf gain {db} dB");
    }

    #[test]
    fn test_unity_gain_identity() {
        let (mut c, mut s) = make(48000.0, 1000.0, 0.0);
        let x = [0.3, -0.6, 0.9, 0.0];
        let mut y = [0.0; 4];
        c.process(&mut s, &x, &mut y);
        for i in 0..4 {
            assert!((y[i] - x[i]).abs() < 1e-5);
        }
    }
}

//! Feed-Forward Compressor
//!
//! Detects the level of a sidechain input with an [`env_follow`]
//! (crate::env_follow)er and, whenever the envelope exceeds the threshold,
//! applies the gain
//!
//! ```text
//! gain = 2^(kc·(log2(thresh) − log2(env)))        kc = 1 − ratio
//! ```
//!
//! to the main input, followed by a smoothed makeup gain. `ratio` here is
//! the inverse slope: `1` means no compression, `0.5` a 2:1 slope, `0` a
//! hard limiter. Threshold and ratio both run through one-pole smoothers
//! (τ = 0.05 s) so automation does not click.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::env_follow::{EnvFollowCoeffs, EnvFollowState};
use crate::gain::GainCoeffs;
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct CompCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    env_follow_coeffs: EnvFollowCoeffs,
    gain_coeffs: GainCoeffs,
    smooth_coeffs: OnePoleCoeffs,
    smooth_thresh_state: OnePoleState,
    smooth_ratio_state: OnePoleState,

    // Coefficients
    kc: f32,
    lt: f32,

    // Parameters
    thresh: f32,
    ratio: f32,
}

/// Per-voice compressor memory.
#[derive(Debug, Clone, Default)]
pub struct CompState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    env_follow_state: EnvFollowState,
}

impl CompState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompCoeffs {
    /// Creates coefficients with default parameters: threshold `1` (0
    /// dBFS), ratio `1` (no compression), makeup gain `1`, instantaneous
    /// envelope.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.05);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("comp_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            env_follow_coeffs: EnvFollowCoeffs::new(),
            gain_coeffs: GainCoeffs::new(),
            smooth_coeffs,
            smooth_thresh_state: OnePoleState::new(),
            smooth_ratio_state: OnePoleState::new(),
            kc: 0.0,
            lt: 0.0,
            thresh: 1.0,
            ratio: 1.0,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.env_follow_coeffs.set_sample_rate(sample_rate);
        self.gain_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
    }

    fn do_update_coeffs_audio(&mut self) {
        self.env_follow_coeffs.update_coeffs_audio();
        self.gain_coeffs.update_coeffs_audio();
        self.smooth_coeffs
            .process1(&mut self.smooth_thresh_state, self.thresh);
        self.kc = 1.0
            - self
                .smooth_coeffs
                .process1(&mut self.smooth_ratio_state, self.ratio);
        self.lt = math::log2(self.smooth_coeffs.get_y_z1(&self.smooth_thresh_state));
    }

    /// Snaps the smoothed parameters to their targets and bumps the reset
    /// epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.env_follow_coeffs.reset_coeffs();
        self.gain_coeffs.reset_coeffs();
        self.smooth_coeffs
            .reset_state(&mut self.smooth_thresh_state, self.thresh);
        self.smooth_coeffs
            .reset_state(&mut self.smooth_ratio_state, self.ratio);
        self.do_update_coeffs_audio();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` from the initial main input `x0` and sidechain input
    /// `x_sc0`; returns the steady output.
    pub fn reset_state(&self, state: &mut CompState, x0: f32, x_sc0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite() && x_sc0.is_finite());
        let env = self
            .env_follow_coeffs
            .reset_state(&mut state.env_follow_state, x_sc0);
        let y = if env > self.smooth_coeffs.get_y_z1(&self.smooth_thresh_state) {
            math::pow2(self.kc * (self.lt - math::log2(env))) * x0
        } else {
            x0
        };
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("comp_state");
            state.coeffs_reset_id = self.reset_id;
        }
        self.gain_coeffs.get_gain_cur() * y
    }

    /// Resets each of the states with the corresponding initial inputs,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [CompState],
        x0: &[f32],
        x_sc0: &[f32],
        y0: Option<&mut [f32]>,
    ) {
        dsp_debug_assert!(states.len() == x0.len() && states.len() == x_sc0.len());
        match y0 {
            Some(y0) => {
                for (i, (state, y)) in states.iter_mut().zip(y0).enumerate() {
                    *y = self.reset_state(state, x0[i], x_sc0[i]);
                }
            }
            None => {
                for (i, state) in states.iter_mut().enumerate() {
                    self.reset_state(state, x0[i], x_sc0[i]);
                }
            }
        }
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.env_follow_coeffs.update_coeffs_ctrl();
        self.gain_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances envelope, makeup, threshold, and ratio
    /// smoothers, re-deriving the gain-law constants.
    pub fn update_coeffs_audio(&mut self) {
        self.do_update_coeffs_audio();
    }

    /// Compresses one main-input sample against one sidechain sample.
    #[inline]
    pub fn process1(&self, state: &mut CompState, x: f32, x_sc: f32) -> f32 {
        dsp_debug_assert!(x.is_finite() && x_sc.is_finite());
        let env = self
            .env_follow_coeffs
            .process1(&mut state.env_follow_state, x_sc);
        let y = if env > self.smooth_coeffs.get_y_z1(&self.smooth_thresh_state) {
            math::pow2(self.kc * (self.lt - math::log2(env))) * x
        } else {
            x
        };
        self.gain_coeffs.process1(y)
    }

    /// Processes `x` against the sidechain `x_sc` into `y`.
    pub fn process(&mut self, state: &mut CompState, x: &[f32], x_sc: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == x_sc.len() && x.len() == y.len());
        self.update_coeffs_ctrl();
        for (i, yi) in y.iter_mut().enumerate() {
            self.update_coeffs_audio();
            *yi = self.process1(state, x[i], x_sc[i]);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(
        &mut self,
        states: &mut [CompState],
        x: &[&[f32]],
        x_sc: &[&[f32]],
        y: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == x.len() && states.len() == x_sc.len());
        dsp_debug_assert!(states.len() == y.len());
        self.update_coeffs_ctrl();
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for (j, state) in states.iter_mut().enumerate() {
                y[j][i] = self.process1(state, x[j][i], x_sc[j][i]);
            }
        }
    }

    /// Sets the threshold as a linear level. Valid range: `[1e-20, 1e20]`.
    pub fn set_thresh_lin(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-20..=1e20).contains(&value));
        self.thresh = value;
    }

    /// Sets the threshold in dBFS.
    pub fn set_thresh_dbfs(&mut self, value: f32) {
        dsp_debug_assert!(!value.is_nan());
        self.set_thresh_lin(math::db2lin(value));
    }

    /// Sets the compression slope coefficient (inverse ratio). Valid
    /// range: `[0, 1]`; `1` is no compression, `0.25` a 4:1 slope, `0` a
    /// hard limit.
    pub fn set_ratio(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.ratio = value;
    }

    /// Sets the envelope attack time constant (s).
    pub fn set_attack_tau(&mut self, value: f32) {
        self.env_follow_coeffs.set_attack_tau(value);
    }

    /// Sets the envelope release time constant (s).
    pub fn set_release_tau(&mut self, value: f32) {
        self.env_follow_coeffs.set_release_tau(value);
    }

    /// Sets the makeup gain as a linear factor.
    pub fn set_gain_lin(&mut self, value: f32) {
        self.gain_coeffs.set_gain_lin(value);
    }

    /// Sets the makeup gain in dB.
    pub fn set_gain_db(&mut self, value: f32) {
        self.gain_coeffs.set_gain_db(value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("comp_coeffs") {
                return false;
            }
        }
        if !(self.thresh.is_finite() && self.thresh > 0.0) {
            return false;
        }
        if !(self.ratio.is_finite() && (0.0..=1.0).contains(&self.ratio)) {
            return false;
        }
        self.env_follow_coeffs.coeffs_is_valid()
            && self.gain_coeffs.coeffs_is_valid()
            && self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &CompState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("comp_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.env_follow_coeffs
            .state_is_valid(&state.env_follow_state)
    }
}

impl Default for CompCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, fs: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (core::f32::consts::TAU * freq * i as f32 / fs).sin())
            .collect()
    }

    #[test]
    fn test_unity_ratio_passthrough() {
        // ratio = 1, gain = 1: output equals input regardless of threshold
        let mut c = CompCoeffs::new();
        c.set_thresh_dbfs(-30.0);
        c.set_attack_tau(0.01);
        c.set_release_tau(0.1);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = CompState::new();
        c.reset_state(&mut s, 0.0, 0.0);
        let x = sine(1000.0, 48000.0, 2048);
        let mut y = vec![0.0f32; 2048];
        c.process(&mut s, &x, &x, &mut y);
        for i in 0..2048 {
            assert!((y[i] - x[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_four_to_one_at_minus_20() {
        // 4:1 above -20 dBFS on a 0 dBFS sine: sustained output amplitude
        // 10^(-15/20) ~= 0.178
        let fs = 48000.0;
        let mut c = CompCoeffs::new();
        c.set_thresh_dbfs(-20.0);
        c.set_ratio(0.25);
        c.set_attack_tau(0.01);
        c.set_release_tau(0.1);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = CompState::new();
        c.reset_state(&mut s, 0.0, 0.0);
        let x = sine(1000.0, fs, 4800);
        let mut y = vec![0.0f32; 4800];
        c.process(&mut s, &x, &x, &mut y);
        // sustained amplitude from the RMS of the settled tail
        let tail = &y[3800..];
        let rms = (tail.iter().map(|v| v * v).sum::<f32>() / tail.len() as f32).sqrt();
        let amp = rms * core::f32::consts::SQRT_2;
        assert!(
            (amp - 0.178).abs() / 0.178 < 0.1,
            "sustained amplitude {amp}"
        );
    }

    #[test]
    fn test_below_threshold_untouched() {
        let fs = 48000.0;
        let mut c = CompCoeffs::new();
        c.set_thresh_dbfs(-6.0);
        c.set_ratio(0.25);
        c.set_attack_tau(0.001);
        c.set_release_tau(0.01);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = CompState::new();
        c.reset_state(&mut s, 0.0, 0.0);
        let x: Vec<f32> = sine(1000.0, fs, 2048).iter().map(|v| 0.1 * v).collect();
        let mut y = vec![0.0f32; 2048];
        c.process(&mut s, &x, &x, &mut y);
        for i in 1024..2048 {
            assert!((y[i] - x[i]).abs() < 1e-4);
        }
    }

    #[test]
    fn test_makeup_gain() {
        let mut c = CompCoeffs::new();
        c.set_gain_db(6.0);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = CompState::new();
        let y0 = c.reset_state(&mut s, 0.5, 0.0);
        assert!((y0 - 0.5 * math::db2lin(6.0)).abs() < 1e-4);
    }
}

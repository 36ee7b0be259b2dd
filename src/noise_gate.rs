//! Noise Gate
//!
//! The downward-expansion mirror of the [`comp`](crate::comp)ressor:
//! whenever the sidechain envelope falls below the threshold, the gain
//!
//! ```text
//! gain = 2^(kc·(log2(thresh) − log2(env)))        kc = 1 − 1/rev_ratio
//! ```
//!
//! attenuates the main input, where `rev_ratio = 1/ratio` is smoothed.
//! `ratio = 1` leaves the signal untouched; very large ratios drive
//! `rev_ratio` to `0` and `kc` to `−∞`, which makes the gate hard
//! (`2^(−∞) = 0` below threshold). Envelopes below `1e-30` short-circuit
//! to silence so the logarithm never sees a denormal.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::env_follow::{EnvFollowCoeffs, EnvFollowState};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct NoiseGateCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    env_follow_coeffs: EnvFollowCoeffs,
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

/// Per-voice gate memory.
#[derive(Debug, Clone, Default)]
pub struct NoiseGateState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    env_follow_state: EnvFollowState,
}

impl NoiseGateState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NoiseGateCoeffs {
    /// Creates coefficients with default parameters: threshold `1` (0
    /// dBFS), ratio `1` (no gating), instantaneous envelope.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.05);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("noise_gate_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            env_follow_coeffs: EnvFollowCoeffs::new(),
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
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
    }

    fn rev_ratio_target(&self) -> f32 {
        if self.ratio > 1e12 {
            0.0
        } else {
            math::rcp(self.ratio)
        }
    }

    fn do_update_coeffs_audio(&mut self) {
        self.env_follow_coeffs.update_coeffs_audio();
        self.smooth_coeffs
            .process1(&mut self.smooth_thresh_state, self.thresh);
        let rev_ratio_target = self.rev_ratio_target();
        let rev_ratio = self
            .smooth_coeffs
            .process1(&mut self.smooth_ratio_state, rev_ratio_target);
        self.kc = if rev_ratio < 1e-12 {
            f32::NEG_INFINITY
        } else {
            1.0 - math::rcp(rev_ratio)
        };
        self.lt = math::log2(self.smooth_coeffs.get_y_z1(&self.smooth_thresh_state));
    }

    /// Snaps the smoothed parameters to their targets and bumps the reset
    /// epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.env_follow_coeffs.reset_coeffs();
        self.smooth_coeffs
            .reset_state(&mut self.smooth_thresh_state, self.thresh);
        let rev_ratio_target = self.rev_ratio_target();
        self.smooth_coeffs
            .reset_state(&mut self.smooth_ratio_state, rev_ratio_target);
        self.do_update_coeffs_audio();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    #[inline]
    fn gate(&self, env: f32, x: f32) -> f32 {
        if env < self.smooth_coeffs.get_y_z1(&self.smooth_thresh_state) {
            if env >= 1e-30 {
                math::pow2(self.kc * (self.lt - math::log2(env))) * x
            } else {
                0.0
            }
        } else {
            x
        }
    }

    /// Seeds `state` from the initial main input `x0` and sidechain input
    /// `x_sc0` (`None` means no sidechain, treated as zero); returns the
    /// steady output.
    pub fn reset_state(&self, state: &mut NoiseGateState, x0: f32, x_sc0: Option<f32>) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let x_sc0 = x_sc0.unwrap_or(0.0);
        let env = self
            .env_follow_coeffs
            .reset_state(&mut state.env_follow_state, x_sc0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("noise_gate_state");
            state.coeffs_reset_id = self.reset_id;
        }
        self.gate(env, x0)
    }

    /// Resets each of the states with the corresponding initial inputs,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [NoiseGateState],
        x0: &[f32],
        x_sc0: Option<&[f32]>,
        y0: Option<&mut [f32]>,
    ) {
        dsp_debug_assert!(states.len() == x0.len());
        match y0 {
            Some(y0) => {
                for (i, (state, y)) in states.iter_mut().zip(y0).enumerate() {
                    *y = self.reset_state(state, x0[i], x_sc0.map(|sc| sc[i]));
                }
            }
            None => {
                for (i, state) in states.iter_mut().enumerate() {
                    self.reset_state(state, x0[i], x_sc0.map(|sc| sc[i]));
                }
            }
        }
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.env_follow_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances envelope, threshold, and ratio
    /// smoothers, re-deriving the gate-law constants.
    pub fn update_coeffs_audio(&mut self) {
        self.do_update_coeffs_audio();
    }

    /// Gates one main-input sample against one sidechain sample.
    #[inline]
    pub fn process1(&self, state: &mut NoiseGateState, x: f32, x_sc: f32) -> f32 {
        dsp_debug_assert!(x.is_finite() && x_sc.is_finite());
        let env = self
            .env_follow_coeffs
            .process1(&mut state.env_follow_state, x_sc);
        self.gate(env, x)
    }

    /// Processes `x` against the sidechain `x_sc` into `y`. A `None`
    /// sidechain is treated as silence (which fully closes the gate for
    /// any threshold above the floor).
    pub fn process(
        &mut self,
        state: &mut NoiseGateState,
        x: &[f32],
        x_sc: Option<&[f32]>,
        y: &mut [f32],
    ) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        match x_sc {
            Some(x_sc) => {
                dsp_debug_assert!(x.len() == x_sc.len());
                for (i, yi) in y.iter_mut().enumerate() {
                    self.update_coeffs_audio();
                    *yi = self.process1(state, x[i], x_sc[i]);
                }
            }
            None => {
                for (i, yi) in y.iter_mut().enumerate() {
                    self.update_coeffs_audio();
                    *yi = self.process1(state, x[i], 0.0);
                }
            }
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(
        &mut self,
        states: &mut [NoiseGateState],
        x: &[&[f32]],
        x_sc: Option<&[&[f32]]>,
        y: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == x.len() && states.len() == y.len());
        self.update_coeffs_ctrl();
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for (j, state) in states.iter_mut().enumerate() {
                let sc = x_sc.map_or(0.0, |sc| sc[j][i]);
                y[j][i] = self.process1(state, x[j][i], sc);
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

    /// Sets the expansion ratio. Valid range: `[1, +inf)`; `1` leaves the
    /// signal untouched, `+inf` (or anything above `1e12`) gates hard.
    pub fn set_ratio(&mut self, value: f32) {
        dsp_debug_assert!(!value.is_nan() && value >= 1.0);
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

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("noise_gate_coeffs") {
                return false;
            }
        }
        if !(self.thresh.is_finite() && self.thresh > 0.0) {
            return false;
        }
        if self.ratio.is_nan() || self.ratio < 1.0 {
            return false;
        }
        self.env_follow_coeffs.coeffs_is_valid() && self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &NoiseGateState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("noise_gate_state") {
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

impl Default for NoiseGateCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(thresh_db: f32, ratio: f32) -> (NoiseGateCoeffs, NoiseGateState) {
        let mut c = NoiseGateCoeffs::new();
        c.set_thresh_dbfs(thresh_db);
        c.set_ratio(ratio);
        c.set_attack_tau(0.001);
        c.set_release_tau(0.01);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = NoiseGateState::new();
        c.reset_state(&mut s, 0.0, None);
        (c, s)
    }

    #[test]
    fn test_unity_ratio_passthrough() {
        let (mut c, mut s) = make(-20.0, 1.0);
        let x: Vec<f32> = (0..1024).map(|i| 0.01 * (i as f32 * 0.1).sin()).collect();
        let mut y = vec![0.0f32; 1024];
        let sc = x.clone();
        c.process(&mut s, &x, Some(&sc), &mut y);
        for i in 0..1024 {
            assert!((y[i] - x[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hard_gate_limit() {
        // ratio > 1e12: kc = -inf, pow2(-inf) = 0 below threshold
        let (c, mut s) = make(-20.0, 1e13);
        // quiet sidechain: envelope 0.01, well below the 0.1 threshold
        let y = c.process1(&mut s, 0.5, 0.01);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_loud_passes() {
        let (c, mut s) = make(-20.0, 4.0);
        // settle the envelope above threshold: untouched
        c.reset_state(&mut s, 0.5, Some(0.5));
        let y = c.process1(&mut s, 0.5, 0.5);
        assert_eq!(y, 0.5);
    }

    #[test]
    fn test_zero_envelope_silences() {
        let (c, mut s) = make(-20.0, 2.0);
        let y = c.process1(&mut s, 0.7, 0.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_expansion_law() {
        // ratio 2: a signal 12 dB below threshold is attenuated another 12 dB
        let (c, mut s) = make(-20.0, 2.0);
        let env = math::db2lin(-32.0);
        c.reset_state(&mut s, 1.0, Some(env));
        let y = c.process1(&mut s, 1.0, env);
        let expected = math::db2lin(-12.0);
        assert!(
            (y - expected).abs() / expected < 0.02,
            "gate gain {y}, expected {expected}"
        );
    }

    #[test]
    fn test_missing_sidechain_closes_gate() {
        let (mut c, mut s) = make(-20.0, 1e13);
        let x = vec![0.5f32; 256];
        let mut y = vec![1.0f32; 256];
        c.process(&mut s, &x, None, &mut y);
        assert!(y.iter().all(|&v| v == 0.0));
    }
}

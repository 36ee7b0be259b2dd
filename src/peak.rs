//! Second-Order Peak (Bell) Filter
//!
//! Adds a resonant boost or cut of settable gain around the cutoff,
//! leaving DC and Nyquist untouched: `y = x + (G − 1)·k·bp`, where `bp` is
//! the band-pass output of an embedded [`svf`](crate::svf) and `k = 1/Q`
//! normalizes its peak gain to unity at the cutoff.
//!
//! The filter width can be set directly as Q or as a bandwidth in octaves,
//! in which case `Q = √(2^bw·G)/(2^bw − 1)` keeps the band edges at
//! half-gain independently of the peak gain.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState, StickyMode};
use crate::svf::{SvfCoeffs, SvfState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct PeakCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    svf_coeffs: SvfCoeffs,
    smooth_coeffs: OnePoleCoeffs,
    smooth_gain_state: OnePoleState,

    // Coefficients
    kg: f32, // (G - 1)/Q

    // Parameters
    cutoff: f32,
    q: f32,
    peak_gain: f32,
    bandwidth: f32,
    use_bandwidth: bool,
    update: bool,
}

/// Per-voice filter memory.
#[derive(Debug, Clone, Default)]
pub struct PeakState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    svf_state: SvfState,
}

impl PeakState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeakCoeffs {
    /// Creates coefficients with default parameters: cutoff `1e3` Hz,
    /// Q `0.5`, peak gain `1` (identity), bandwidth `2.543` octaves,
    /// bandwidth mode on.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.005);
        smooth_coeffs.set_sticky_thresh(1e-6);
        smooth_coeffs.set_sticky_mode(StickyMode::Rel);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("peak_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            svf_coeffs: SvfCoeffs::new(),
            smooth_coeffs,
            smooth_gain_state: OnePoleState::new(),
            kg: 0.0,
            cutoff: 1e3,
            q: 0.5,
            peak_gain: 1.0,
            bandwidth: 2.543,
            use_bandwidth: true,
            update: true,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.svf_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
    }

    fn resolved_q(&self) -> f32 {
        if self.use_bandwidth {
            let p = math::pow2(self.bandwidth);
            math::sqrt(p * self.peak_gain) * math::rcp(p - 1.0)
        } else {
            self.q
        }
    }

    fn update_svf_params(&mut self) {
        if self.update {
            self.svf_coeffs.set_cutoff(self.cutoff);
            self.svf_coeffs.set_q(self.resolved_q());
            self.update = false;
        }
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.update = true;
        self.update_svf_params();
        self.svf_coeffs.reset_coeffs();
        self.smooth_coeffs
            .reset_state(&mut self.smooth_gain_state, self.peak_gain);
        self.kg = (self.peak_gain - 1.0) * math::rcp(self.resolved_q());
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns `x0` (unity
    /// DC gain).
    pub fn reset_state(&self, state: &mut PeakState, x0: f32) -> f32 {
        let (_, bp, _) = self.svf_coeffs.reset_state(&mut state.svf_state, x0);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("peak_state");
            state.coeffs_reset_id = self.reset_id;
        }
        x0 + self.kg * bp
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [PeakState],
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

    /// Control-rate update: pushes any pending cutoff/width mapping into
    /// the embedded SVF.
    pub fn update_coeffs_ctrl(&mut self) {
        self.update_svf_params();
        self.svf_coeffs.update_coeffs_ctrl();
        self.smooth_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the gain smoother and re-derives the
    /// band-pass weighting.
    pub fn update_coeffs_audio(&mut self) {
        self.svf_coeffs.update_coeffs_audio();
        self.smooth_coeffs.update_coeffs_audio();
        let gain_cur = self
            .smooth_coeffs
            .process1_sticky_rel(&mut self.smooth_gain_state, self.peak_gain);
        self.kg = (gain_cur - 1.0) * math::rcp(self.resolved_q());
    }

    /// Filters one sample.
    #[inline]
    pub fn process1(&self, state: &mut PeakState, x: f32) -> f32 {
        let (_, bp, _) = self.svf_coeffs.process1(&mut state.svf_state, x);
        x + self.kg * bp
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut PeakState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [PeakState], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the cutoff (center) frequency (Hz).
    pub fn set_cutoff(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e12).contains(&value));
        if value != self.cutoff {
            self.cutoff = value;
            self.update = true;
        }
    }

    /// Sets the quality factor directly (used when bandwidth mode is off).
    pub fn set_q(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e6).contains(&value));
        if value != self.q {
            self.q = value;
            self.update = true;
        }
    }

    /// Sets the peak gain as a linear factor. Valid range: `[1e-30, 1e30]`.
    pub fn set_peak_gain_lin(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && value >= 1e-30);
        if value != self.peak_gain {
            self.peak_gain = value;
            self.update = true;
        }
    }

    /// Sets the peak gain in dB.
    pub fn set_peak_gain_db(&mut self, value: f32) {
        dsp_debug_assert!(!value.is_nan());
        self.set_peak_gain_lin(math::db2lin(value));
    }

    /// Sets the bandwidth (octaves), used in bandwidth mode.
    /// Valid range: `[1e-6, 90]`.
    pub fn set_bandwidth(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=90.0).contains(&value));
        if value != self.bandwidth {
            self.bandwidth = value;
            self.update = true;
        }
    }

    /// Chooses between bandwidth mode (default) and direct-Q mode.
    pub fn set_use_bandwidth(&mut self, value: bool) {
        if value != self.use_bandwidth {
            self.use_bandwidth = value;
            self.update = true;
        }
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("peak_coeffs") {
                return false;
            }
        }
        if !(self.cutoff.is_finite() && (1e-6..=1e12).contains(&self.cutoff)) {
            return false;
        }
        if !(self.peak_gain.is_finite() && self.peak_gain >= 1e-30) {
            return false;
        }
        self.svf_coeffs.coeffs_is_valid() && self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &PeakState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("peak_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.svf_coeffs.state_is_valid(&state.svf_state)
    }
}

impl Default for PeakCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fs: f32, cutoff: f32, gain_db: f32) -> (PeakCoeffs, PeakState) {
        let mut c = PeakCoeffs::new();
        c.set_cutoff(cutoff);
        c.set_peak_gain_db(gain_db);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = PeakState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    fn band_gain_db(c: &mut PeakCoeffs, s: &mut PeakState, freq: f32, fs: f32) -> f32 {
        let x: Vec<f32> = (0..16384)
            .map(|i| (core::f32::consts::TAU * freq * i as f32 / fs).sin())
            .collect();
        let mut y = vec![0.0f32; 16384];
        c.process(s, &x, &mut y);
        let rms = |v: &[f32]| (v.iter().map(|a| a * a).sum::<f32>() / v.len() as f32).sqrt();
        20.0 * (rms(&y[8192..]) / rms(&x[8192..])).log10()
    }

    #[test]
    fn test_unity_gain_identity() {
        let (mut c, mut s) = make(48000.0, 1000.0, 0.0);
        let x = [0.5, -0.5, 0.25, 0.0];
        let mut y = [0.0; 4];
        c.process(&mut s, &x, &mut y);
        for i in 0..4 {
            assert!((y[i] - x[i]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_boost_at_center() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 1000.0, 12.0);
        let db = band_gain_db(&mut c, &mut s, 1000.0, fs);
        assert!((db - 12.0).abs() < 1.0, "peak gain {db} dB");
    }

    #[test]
    fn test_flat_far_from_center() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 1000.0, 12.0);
        let db = band_gain_db(&mut c, &mut s, 50.0, fs);
        assert!(db.abs() < 1.0, "skirt gain {db} dB");
    }

    #[test]
    fn test_cut_at_center() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 2000.0, -9.0);
        let db = band_gain_db(&mut c, &mut s, 2000.0, fs);
        assert!((db + 9.0).abs() < 1.0, "cut gain {db} dB");
    }

    #[test]
    fn test_direct_q_mode() {
        let fs = 48000.0;
        let mut c = PeakCoeffs::new();
        c.set_use_bandwidth(false);
        c.set_q(4.0);
        c.set_cutoff(1000.0);
        c.set_peak_gain_db(6.0);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = PeakState::new();
        c.reset_state(&mut s, 0.0);
        let db = band_gain_db(&mut c, &mut s, 1000.0, fs);
        assert!((db - 6.0).abs() < 1.0);
    }
}

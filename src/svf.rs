//! State-Variable Filter
//!
//! Topology-preserving (trapezoidal-integration) second-order state-variable
//! filter producing low-pass, band-pass, and high-pass outputs in one pass.
//! Cutoff, quality factor, and prewarp frequency all run through one-pole
//! smoothers, so the filter can be swept at audio rate without zipper noise.
//!
//! Coefficient derivation, per sample (with `T = 1/fs`):
//!
//! ```text
//! g  = (fc/fp)·tan(π·fp·T)      fp clamped into (1e-6, 0.499·fs)
//! k  = 1/Q
//! a1 = 1/(1 + g·(g + k)),  a2 = g·a1,  a3 = g·a2
//! ```
//!
//! By default the prewarp frequency tracks the cutoff, making the frequency
//! response exact at `fc`; [`set_prewarp_at_cutoff`](SvfCoeffs::set_prewarp_at_cutoff)
//! plus [`set_prewarp_freq`](SvfCoeffs::set_prewarp_freq) decouple it, which
//! matters when several filters must share one bilinear-transform frequency
//! mapping.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState, StickyMode};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct SvfCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    smooth_coeffs: OnePoleCoeffs,
    smooth_cutoff_state: OnePoleState,
    smooth_q_state: OnePoleState,
    smooth_prewarp_freq_state: OnePoleState,

    // Coefficients
    t_k: f32, // π / fs
    prewarp_freq_max: f32,
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,
    cutoff_cur: f32,
    q_cur: f32,
    prewarp_freq_cur: f32,

    // Parameters
    cutoff: f32,
    q: f32,
    prewarp_k: f32, // 1 = prewarp at cutoff, 0 = at prewarp_freq
    prewarp_freq: f32,
}

/// Per-voice filter memory: the two trapezoidal integrator states.
#[derive(Debug, Clone, Default)]
pub struct SvfState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    ic1eq: f32,
    ic2eq: f32,
}

impl SvfState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SvfCoeffs {
    /// Creates coefficients with default parameters: cutoff `1e3` Hz,
    /// Q `0.5`, prewarp frequency tracking the cutoff.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.005);
        smooth_coeffs.set_sticky_thresh(1e-6);
        smooth_coeffs.set_sticky_mode(StickyMode::Rel);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("svf_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            smooth_coeffs,
            smooth_cutoff_state: OnePoleState::new(),
            smooth_q_state: OnePoleState::new(),
            smooth_prewarp_freq_state: OnePoleState::new(),
            t_k: 0.0,
            prewarp_freq_max: 0.0,
            k: 0.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            cutoff_cur: 0.0,
            q_cur: 0.0,
            prewarp_freq_cur: 0.0,
            cutoff: 1e3,
            q: 0.5,
            prewarp_k: 1.0,
            prewarp_freq: 1e3,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        dsp_debug_assert!(sample_rate.is_finite() && sample_rate > 0.0);
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
        self.t_k = core::f32::consts::PI / sample_rate;
        self.prewarp_freq_max = 0.499 * sample_rate;
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::SetSampleRate;
        }
    }

    fn derive(&mut self) {
        let g = self.cutoff_cur
            * math::rcp(self.prewarp_freq_cur)
            * math::tan(self.t_k * self.prewarp_freq_cur);
        self.k = math::rcp(self.q_cur);
        self.a1 = math::rcp(1.0 + g * (g + self.k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    fn do_update_coeffs(&mut self, force: bool) {
        let prewarp_target = math::clip(
            self.prewarp_freq + self.prewarp_k * (self.cutoff - self.prewarp_freq),
            1e-6,
            self.prewarp_freq_max,
        );
        let mut changed = force;
        if force || self.smooth_coeffs.get_y_z1(&self.smooth_cutoff_state) != self.cutoff {
            self.cutoff_cur = self
                .smooth_coeffs
                .process1_sticky_rel(&mut self.smooth_cutoff_state, self.cutoff);
            changed = true;
        }
        if force || self.smooth_coeffs.get_y_z1(&self.smooth_prewarp_freq_state) != prewarp_target
        {
            self.prewarp_freq_cur = math::clip(
                self.smooth_coeffs
                    .process1_sticky_rel(&mut self.smooth_prewarp_freq_state, prewarp_target),
                1e-6,
                self.prewarp_freq_max,
            );
            changed = true;
        }
        if force || self.smooth_coeffs.get_y_z1(&self.smooth_q_state) != self.q {
            self.q_cur = self
                .smooth_coeffs
                .process1_sticky_rel(&mut self.smooth_q_state, self.q);
            changed = true;
        }
        if changed {
            self.derive();
        }
    }

    /// Snaps the smoothed parameters to their targets, re-derives the
    /// integrator coefficients, and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.smooth_coeffs
            .reset_state(&mut self.smooth_cutoff_state, self.cutoff);
        self.smooth_coeffs.reset_state(
            &mut self.smooth_prewarp_freq_state,
            self.prewarp_freq + self.prewarp_k * (self.cutoff - self.prewarp_freq),
        );
        self.smooth_coeffs.reset_state(&mut self.smooth_q_state, self.q);
        self.do_update_coeffs(true);
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// `(lp, bp, hp)` outputs, i.e. `(x0, 0, 0)`.
    pub fn reset_state(&self, state: &mut SvfState, x0: f32) -> (f32, f32, f32) {
        dsp_debug_assert!(x0.is_finite());
        state.ic1eq = 0.0;
        state.ic2eq = x0;
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("svf_state");
            state.coeffs_reset_id = self.reset_id;
        }
        (x0, 0.0, 0.0)
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial low-pass outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [SvfState],
        x0: &[f32],
        y0: Option<&mut [f32]>,
    ) {
        dsp_debug_assert!(states.len() == x0.len());
        match y0 {
            Some(y0) => {
                for ((state, &x), y) in states.iter_mut().zip(x0).zip(y0) {
                    let (lp, _, _) = self.reset_state(state, x);
                    *y = lp;
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
        self.smooth_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the parameter smoothers and re-derives
    /// the integrator coefficients when anything moved.
    pub fn update_coeffs_audio(&mut self) {
        self.smooth_coeffs.update_coeffs_audio();
        self.do_update_coeffs(false);
    }

    /// Filters one sample; returns `(lp, bp, hp)`.
    #[inline]
    pub fn process1(&self, state: &mut SvfState, x: f32) -> (f32, f32, f32) {
        dsp_debug_assert!(x.is_finite());
        let v3 = x - state.ic2eq;
        let v1 = self.a1 * state.ic1eq + self.a2 * v3;
        let v2 = state.ic2eq + self.a2 * state.ic1eq + self.a3 * v3;
        state.ic1eq = v1 + v1 - state.ic1eq;
        state.ic2eq = v2 + v2 - state.ic2eq;
        let lp = v2;
        let bp = v1;
        let hp = x - self.k * v1 - v2;
        (lp, bp, hp)
    }

    /// Processes `x`, writing whichever outputs are requested.
    pub fn process(
        &mut self,
        state: &mut SvfState,
        x: &[f32],
        mut y_lp: Option<&mut [f32]>,
        mut y_bp: Option<&mut [f32]>,
        mut y_hp: Option<&mut [f32]>,
    ) {
        self.update_coeffs_ctrl();
        for (i, &xi) in x.iter().enumerate() {
            self.update_coeffs_audio();
            let (lp, bp, hp) = self.process1(state, xi);
            if let Some(y) = y_lp.as_deref_mut() {
                y[i] = lp;
            }
            if let Some(y) = y_bp.as_deref_mut() {
                y[i] = bp;
            }
            if let Some(y) = y_hp.as_deref_mut() {
                y[i] = hp;
            }
        }
    }

    /// Multi-channel [`process`](Self::process): shared coefficients, one
    /// state per channel, sample-outer/channel-inner iteration.
    pub fn process_multi(
        &mut self,
        states: &mut [SvfState],
        x: &[&[f32]],
        mut y_lp: Option<&mut [&mut [f32]]>,
        mut y_bp: Option<&mut [&mut [f32]]>,
        mut y_hp: Option<&mut [&mut [f32]]>,
    ) {
        dsp_debug_assert!(states.len() == x.len());
        self.update_coeffs_ctrl();
        let n_samples = x.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for (j, state) in states.iter_mut().enumerate() {
                let (lp, bp, hp) = self.process1(state, x[j][i]);
                if let Some(y) = y_lp.as_deref_mut() {
                    y[j][i] = lp;
                }
                if let Some(y) = y_bp.as_deref_mut() {
                    y[j][i] = bp;
                }
                if let Some(y) = y_hp.as_deref_mut() {
                    y[j][i] = hp;
                }
            }
        }
    }

    /// Sets the cutoff frequency (Hz). Valid range: `[1e-6, 1e12]`.
    pub fn set_cutoff(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e12).contains(&value));
        self.cutoff = value;
    }

    /// Sets the quality factor. Valid range: `[1e-6, 1e6]`.
    pub fn set_q(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e6).contains(&value));
        self.q = value;
    }

    /// Chooses whether the prewarp frequency tracks the cutoff (default
    /// `true`) or follows [`set_prewarp_freq`](Self::set_prewarp_freq).
    pub fn set_prewarp_at_cutoff(&mut self, value: bool) {
        self.prewarp_k = if value { 1.0 } else { 0.0 };
    }

    /// Sets the prewarp frequency (Hz), used when prewarp-at-cutoff is
    /// disabled. Valid range: `[1e-6, 1e12]`; internally clamped below the
    /// Nyquist frequency.
    pub fn set_prewarp_freq(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e12).contains(&value));
        self.prewarp_freq = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("svf_coeffs") {
                return false;
            }
        }
        if !(self.cutoff.is_finite() && (1e-6..=1e12).contains(&self.cutoff)) {
            return false;
        }
        if !(self.q.is_finite() && (1e-6..=1e6).contains(&self.q)) {
            return false;
        }
        if !(self.prewarp_freq.is_finite() && (1e-6..=1e12).contains(&self.prewarp_freq)) {
            return false;
        }
        self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &SvfState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("svf_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        state.ic1eq.is_finite() && state.ic2eq.is_finite()
    }
}

impl Default for SvfCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fs: f32, cutoff: f32, q: f32) -> (SvfCoeffs, SvfState) {
        let mut c = SvfCoeffs::new();
        c.set_cutoff(cutoff);
        c.set_q(q);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = SvfState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    fn sine(freq: f32, fs: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (core::f32::consts::TAU * freq * i as f32 / fs).sin())
            .collect()
    }

    fn rms(x: &[f32]) -> f32 {
        (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
    }

    #[test]
    fn test_dc_response() {
        let (c, mut s) = make(48000.0, 1000.0, 1.0);
        let (lp, bp, hp) = c.reset_state(&mut s, 0.8);
        assert_eq!((lp, bp, hp), (0.8, 0.0, 0.0));
        // steady input holds the steady outputs
        let (lp, bp, hp) = c.process1(&mut s, 0.8);
        assert!((lp - 0.8).abs() < 1e-6);
        assert!(bp.abs() < 1e-6);
        assert!(hp.abs() < 1e-6);
    }

    #[test]
    fn test_notch_rejection_at_cutoff() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 1000.0, 1.0);
        let x = sine(1000.0, fs, 8192);
        let mut lp = vec![0.0f32; 8192];
        let mut hp = vec![0.0f32; 8192];
        c.process(&mut s, &x, Some(&mut lp), None, Some(&mut hp));
        let notch: Vec<f32> = lp[4096..]
            .iter()
            .zip(&hp[4096..])
            .map(|(a, b)| a + b)
            .collect();
        assert!(rms(&notch) < 0.05, "notch rms = {}", rms(&notch));
    }

    #[test]
    fn test_lowpass_passes_low_rejects_high() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 1000.0, 0.707);
        let lo = sine(50.0, fs, 8192);
        let mut y = vec![0.0f32; 8192];
        c.process(&mut s, &lo, Some(&mut y), None, None);
        assert!(rms(&y[4096..]) > 0.6);

        let (mut c, mut s) = make(fs, 1000.0, 0.707);
        let hi = sine(12000.0, fs, 8192);
        c.process(&mut s, &hi, Some(&mut y), None, None);
        assert!(rms(&y[4096..]) < 0.05);
    }

    #[test]
    fn test_finite_under_sweep() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 100.0, 4.0);
        let x = sine(440.0, fs, 4096);
        let mut y = vec![0.0f32; 4096];
        // sweep the cutoff hard while processing, block by block
        for (blk, chunk) in x.chunks(256).enumerate() {
            c.set_cutoff(100.0 * (blk as f32 + 1.0) * 14.0);
            let y_blk = &mut y[blk * 256..(blk + 1) * 256];
            c.process(&mut s, chunk, Some(y_blk), None, None);
        }
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_prewarp_clamp_keeps_stability() {
        // cutoff near Nyquist: tan argument is clamped, output stays finite
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 23000.0, 0.707);
        let x = sine(440.0, fs, 1024);
        let mut y = vec![0.0f32; 1024];
        c.process(&mut s, &x, Some(&mut y), None, None);
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_multi_matches_sequential() {
        let fs = 48000.0;
        let x0 = sine(300.0, fs, 512);
        let x1 = sine(2500.0, fs, 512);
        let (mut c, mut s0) = make(fs, 1200.0, 2.0);
        let mut s1 = SvfState::new();
        c.reset_state(&mut s1, 0.0);

        let mut m0 = vec![0.0f32; 512];
        let mut m1 = vec![0.0f32; 512];
        {
            let mut states = [s0.clone(), s1.clone()];
            let xs: [&[f32]; 2] = [&x0, &x1];
            let mut lps: [&mut [f32]; 2] = [&mut m0, &mut m1];
            c.process_multi(&mut states, &xs, Some(&mut lps), None, None);
        }

        let mut c2 = c.clone();
        let mut q0 = vec![0.0f32; 512];
        let mut q1 = vec![0.0f32; 512];
        c.process(&mut s0, &x0, Some(&mut q0), None, None);
        c2.process(&mut s1, &x1, Some(&mut q1), None, None);
        for i in 0..512 {
            assert!((m0[i] - q0[i]).abs() < 1e-7);
            assert!((m1[i] - q1[i]).abs() < 1e-7);
        }
    }
}

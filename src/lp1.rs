//! First-Order Low-Pass Filter
//!
//! Topology-preserving (trapezoidal) one-pole low-pass with unity DC gain,
//! 6 dB/oct roll-off, smoothed cutoff, and an independently controllable
//! prewarp frequency (tracking the cutoff by default). The first-order
//! building block under [`hp1`](crate::hp1), [`ap1`](crate::ap1), and
//! [`mm1`](crate::mm1).

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState, StickyMode};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct Lp1Coeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    smooth_coeffs: OnePoleCoeffs,
    smooth_cutoff_state: OnePoleState,
    smooth_prewarp_freq_state: OnePoleState,

    // Coefficients
    t_k: f32, // π / fs
    prewarp_freq_max: f32,
    g1: f32, // G/(1+G), the resolved integrator gain
    cutoff_cur: f32,
    prewarp_freq_cur: f32,

    // Parameters
    cutoff: f32,
    prewarp_k: f32,
    prewarp_freq: f32,
}

/// Per-voice filter memory: the trapezoidal integrator state.
#[derive(Debug, Clone, Default)]
pub struct Lp1State {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    s: f32,
}

impl Lp1State {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Lp1Coeffs {
    /// Creates coefficients with default parameters: cutoff `1e3` Hz,
    /// prewarp frequency tracking the cutoff.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.005);
        smooth_coeffs.set_sticky_thresh(1e-6);
        smooth_coeffs.set_sticky_mode(StickyMode::Rel);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("lp1_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            smooth_coeffs,
            smooth_cutoff_state: OnePoleState::new(),
            smooth_prewarp_freq_state: OnePoleState::new(),
            t_k: 0.0,
            prewarp_freq_max: 0.0,
            g1: 0.0,
            cutoff_cur: 0.0,
            prewarp_freq_cur: 0.0,
            cutoff: 1e3,
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
        self.g1 = g * math::rcp(1.0 + g);
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
        if changed {
            self.derive();
        }
    }

    /// Snaps the smoothed parameters to their targets and bumps the reset
    /// epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.smooth_coeffs
            .reset_state(&mut self.smooth_cutoff_state, self.cutoff);
        self.smooth_coeffs.reset_state(
            &mut self.smooth_prewarp_freq_state,
            self.prewarp_freq + self.prewarp_k * (self.cutoff - self.prewarp_freq),
        );
        self.do_update_coeffs(true);
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns `x0` (unity
    /// DC gain).
    pub fn reset_state(&self, state: &mut Lp1State, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        state.s = x0;
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("lp1_state");
            state.coeffs_reset_id = self.reset_id;
        }
        x0
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [Lp1State],
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
        self.smooth_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the parameter smoothers and re-derives
    /// the integrator gain when anything moved.
    pub fn update_coeffs_audio(&mut self) {
        self.smooth_coeffs.update_coeffs_audio();
        self.do_update_coeffs(false);
    }

    /// Filters one sample.
    #[inline]
    pub fn process1(&self, state: &mut Lp1State, x: f32) -> f32 {
        dsp_debug_assert!(x.is_finite());
        let v = self.g1 * (x - state.s);
        let y = v + state.s;
        state.s = y + v;
        y
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut Lp1State, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [Lp1State], x: &[&[f32]], y: &mut [&mut [f32]]) {
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
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e12).contains(&value));
        self.cutoff = value;
    }

    /// Chooses whether the prewarp frequency tracks the cutoff (default
    /// `true`).
    pub fn set_prewarp_at_cutoff(&mut self, value: bool) {
        self.prewarp_k = if value { 1.0 } else { 0.0 };
    }

    /// Sets the prewarp frequency (Hz), used when prewarp-at-cutoff is
    /// disabled.
    pub fn set_prewarp_freq(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e12).contains(&value));
        self.prewarp_freq = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("lp1_coeffs") {
                return false;
            }
        }
        if !(self.cutoff.is_finite() && (1e-6..=1e12).contains(&self.cutoff)) {
            return false;
        }
        if !(self.prewarp_freq.is_finite() && (1e-6..=1e12).contains(&self.prewarp_freq)) {
            return false;
        }
        self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &Lp1State) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("lp1_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        state.s.is_finite()
    }
}

impl Default for Lp1Coeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fs: f32, cutoff: f32) -> (Lp1Coeffs, Lp1State) {
        let mut c = Lp1Coeffs::new();
        c.set_cutoff(cutoff);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = Lp1State::new();
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
    fn test_dc_unity() {
        let (c, mut s) = make(48000.0, 1000.0);
        assert_eq!(c.reset_state(&mut s, 0.6), 0.6);
        let y = c.process1(&mut s, 0.6);
        assert!((y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_cutoff_gain_is_minus_3db() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 1000.0);
        let x = sine(1000.0, fs, 16384);
        let mut y = vec![0.0f32; 16384];
        c.process(&mut s, &x, &mut y);
        let g = rms(&y[8192..]) / rms(&x[8192..]);
        let db = 20.0 * g.log10();
        assert!((db + 3.0).abs() < 0.3, "gain at cutoff = {db} dB");
    }

    #[test]
    fn test_rolloff() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 500.0);
        let x = sine(8000.0, fs, 8192);
        let mut y = vec![0.0f32; 8192];
        c.process(&mut s, &x, &mut y);
        // 4 octaves above cutoff: ~ -24 dB
        let g = rms(&y[4096..]) / rms(&x[4096..]);
        assert!(g < 0.11);
    }

    #[test]
    fn test_smoothed_cutoff_change_is_finite() {
        let fs = 48000.0;
        let (mut c, mut s) = make(fs, 100.0);
        let x = sine(440.0, fs, 2048);
        let mut y = vec![0.0f32; 2048];
        c.process(&mut s, &x[..1024], &mut y[..1024]);
        c.set_cutoff(12000.0);
        c.process(&mut s, &x[1024..], &mut y[1024..]);
        assert!(y.iter().all(|v| v.is_finite()));
    }
}

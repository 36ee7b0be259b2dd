//! Comb Filter
//!
//! A single delay line with independently smoothed feed-forward and
//! feedback taps and three mix gains:
//!
//! ```text
//! v = x + fb_gain·delay(v, delay_fb)
//! y = blend_gain·v + ff_gain·delay(v, delay_ff)
//! ```
//!
//! The feedback tap is read before the write of the current sample (one
//! sample of the loop delay lives in that ordering, so the effective
//! feedback delay is `max(fs·delay_fb, 1) − 1` samples from the line).
//! Tap times move through sticky one-pole smoothers, giving tape-style
//! pitch slews instead of clicks when they change.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::delay::{DelayCoeffs, DelayState};
use crate::gain::GainCoeffs;
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};
use alloc::boxed::Box;

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct CombCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    delay_coeffs: DelayCoeffs,
    blend_coeffs: GainCoeffs,
    ff_coeffs: GainCoeffs,
    fb_coeffs: GainCoeffs,
    smooth_coeffs: OnePoleCoeffs,
    smooth_delay_ff_state: OnePoleState,
    smooth_delay_fb_state: OnePoleState,

    // Coefficients
    fs: f32,
    dffi: usize,
    dfff: f32,
    dfbi: usize,
    dfbf: f32,

    // Parameters
    delay_ff: f32,
    delay_fb: f32,
}

/// Per-voice comb memory.
#[derive(Debug, Default)]
pub struct CombState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    delay_state: DelayState,
}

impl CombState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CombCoeffs {
    /// Creates coefficients with the given maximum delay (s). Defaults:
    /// both tap times `0`, blend gain `1`, feed-forward and feedback gains
    /// `0` (identity).
    pub fn new(max_delay: f32) -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.05);
        smooth_coeffs.set_sticky_thresh(1e-6);
        let mut ff_coeffs = GainCoeffs::new();
        let mut fb_coeffs = GainCoeffs::new();
        ff_coeffs.set_gain_lin(0.0);
        fb_coeffs.set_gain_lin(0.0);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("comb_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            delay_coeffs: DelayCoeffs::new(max_delay),
            blend_coeffs: GainCoeffs::new(),
            ff_coeffs,
            fb_coeffs,
            smooth_coeffs,
            smooth_delay_ff_state: OnePoleState::new(),
            smooth_delay_fb_state: OnePoleState::new(),
            fs: 0.0,
            dffi: 0,
            dfff: 0.0,
            dfbi: 0,
            dfbf: 0.0,
            delay_ff: 0.0,
            delay_fb: 0.0,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.delay_coeffs.set_sample_rate(sample_rate);
        self.blend_coeffs.set_sample_rate(sample_rate);
        self.ff_coeffs.set_sample_rate(sample_rate);
        self.fb_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
        self.fs = sample_rate;
    }

    /// Returns the backing-buffer length, in samples, to hand to
    /// [`mem_set`](Self::mem_set).
    pub fn mem_req(&self) -> usize {
        self.delay_coeffs.mem_req()
    }

    /// Binds `mem` to `state` as the delay-line backing buffer.
    pub fn mem_set(&self, state: &mut CombState, mem: Box<[f32]>) {
        self.delay_coeffs.mem_set(&mut state.delay_state, mem);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("comb_state");
        }
    }

    fn do_update_coeffs(&mut self, force: bool) {
        let delay_ff_cur = self.smooth_coeffs.get_y_z1(&self.smooth_delay_ff_state);
        let delay_fb_cur = self.smooth_coeffs.get_y_z1(&self.smooth_delay_fb_state);
        if force || delay_ff_cur != self.delay_ff {
            let cur = self
                .smooth_coeffs
                .process1_sticky_abs(&mut self.smooth_delay_ff_state, self.delay_ff);
            let len = self.delay_coeffs.get_length();
            let (i, f) = math::intfrac(math::max(self.fs * cur, 0.0));
            self.dffi = i as usize;
            self.dfff = f;
            if self.dffi >= len {
                self.dffi = len;
                self.dfff = 0.0;
            }
        }
        if force || delay_fb_cur != self.delay_fb {
            let cur = self
                .smooth_coeffs
                .process1_sticky_abs(&mut self.smooth_delay_fb_state, self.delay_fb);
            let len = self.delay_coeffs.get_length();
            let (i, f) = math::intfrac(math::max(self.fs * cur, 1.0) - 1.0);
            self.dfbi = i as usize;
            self.dfbf = f;
            if self.dfbi >= len {
                self.dfbi = len;
                self.dfbf = 0.0;
            }
        }
    }

    /// Snaps the smoothed parameters to their targets and bumps the reset
    /// epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.delay_coeffs.reset_coeffs();
        self.blend_coeffs.reset_coeffs();
        self.ff_coeffs.reset_coeffs();
        self.fb_coeffs.reset_coeffs();
        self.smooth_coeffs
            .reset_state(&mut self.smooth_delay_ff_state, self.delay_ff);
        self.smooth_coeffs
            .reset_state(&mut self.smooth_delay_fb_state, self.delay_fb);
        self.do_update_coeffs(true);
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// output. A feedback gain of exactly ±1 has no finite fixed point, so
    /// the line is cleared instead.
    pub fn reset_state(&self, state: &mut CombState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let fb = self.fb_coeffs.get_gain_cur();
        let y = if fb == 1.0 || fb == -1.0 {
            self.delay_coeffs.reset_state(&mut state.delay_state, 0.0);
            0.0
        } else {
            let v = x0 / (1.0 - fb);
            self.delay_coeffs.reset_state(&mut state.delay_state, v);
            (self.ff_coeffs.get_gain_cur() + self.blend_coeffs.get_gain_cur()) * v
        };
        #[cfg(feature = "debug-deep")]
        {
            state.coeffs_reset_id = self.reset_id;
        }
        y
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [CombState],
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
        self.delay_coeffs.update_coeffs_ctrl();
        self.blend_coeffs.update_coeffs_ctrl();
        self.ff_coeffs.update_coeffs_ctrl();
        self.fb_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the gain and tap-time smoothers.
    pub fn update_coeffs_audio(&mut self) {
        self.blend_coeffs.update_coeffs_audio();
        self.ff_coeffs.update_coeffs_audio();
        self.fb_coeffs.update_coeffs_audio();
        self.do_update_coeffs(false);
    }

    /// Processes one sample.
    #[inline]
    pub fn process1(&self, state: &mut CombState, x: f32) -> f32 {
        dsp_debug_assert!(x.is_finite());
        let fb = self
            .delay_coeffs
            .read(&state.delay_state, self.dfbi, self.dfbf);
        let v = x + self.fb_coeffs.process1(fb);
        self.delay_coeffs.write(&mut state.delay_state, v);
        let ff = self
            .delay_coeffs
            .read(&state.delay_state, self.dffi, self.dfff);
        self.blend_coeffs.process1(v) + self.ff_coeffs.process1(ff)
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut CombState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(&mut self, states: &mut [CombState], x: &[&[f32]], y: &mut [&mut [f32]]) {
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

    /// Sets the feed-forward tap time (s). Valid range: `[0, max_delay]`.
    pub fn set_delay_ff(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && value >= 0.0);
        self.delay_ff = value;
    }

    /// Sets the feedback tap time (s). Valid range: `[0, max_delay]`.
    pub fn set_delay_fb(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && value >= 0.0);
        self.delay_fb = value;
    }

    /// Sets the blend (direct) gain.
    pub fn set_coeff_blend(&mut self, value: f32) {
        self.blend_coeffs.set_gain_lin(value);
    }

    /// Sets the feed-forward gain.
    pub fn set_coeff_ff(&mut self, value: f32) {
        self.ff_coeffs.set_gain_lin(value);
    }

    /// Sets the feedback gain. Valid range: `(-1, 1)` for stability.
    pub fn set_coeff_fb(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (-1.0..=1.0).contains(&value));
        self.fb_coeffs.set_gain_lin(value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("comb_coeffs") {
                return false;
            }
        }
        if !(self.delay_ff.is_finite() && self.delay_ff >= 0.0) {
            return false;
        }
        if !(self.delay_fb.is_finite() && self.delay_fb >= 0.0) {
            return false;
        }
        self.delay_coeffs.coeffs_is_valid()
            && self.blend_coeffs.coeffs_is_valid()
            && self.ff_coeffs.coeffs_is_valid()
            && self.fb_coeffs.coeffs_is_valid()
            && self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &CombState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("comb_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.delay_coeffs.state_is_valid(&state.delay_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn make(max_delay: f32) -> (CombCoeffs, CombState) {
        let mut c = CombCoeffs::new(max_delay);
        c.set_sample_rate(48000.0);
        let mut s = CombState::new();
        c.mem_set(&mut s, vec![0.0; c.mem_req()].into_boxed_slice());
        c.reset_coeffs();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_default_is_identity() {
        let (mut c, mut s) = make(0.01);
        let x = [0.5, -0.25, 1.0, 0.0, 0.3];
        let mut y = [0.0; 5];
        c.process(&mut s, &x, &mut y);
        for i in 0..5 {
            assert!((y[i] - x[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_feedforward_echo() {
        let mut c = CombCoeffs::new(0.01);
        c.set_coeff_ff(0.5);
        c.set_delay_ff(100.0 / 48000.0);
        c.set_sample_rate(48000.0);
        let mut s = CombState::new();
        c.mem_set(&mut s, vec![0.0; c.mem_req()].into_boxed_slice());
        c.reset_coeffs();
        c.reset_state(&mut s, 0.0);
        let mut x = vec![0.0f32; 256];
        x[0] = 1.0;
        let mut y = vec![0.0f32; 256];
        c.process(&mut s, &x, &mut y);
        assert!((y[0] - 1.0).abs() < 1e-6);
        assert!((y[100] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_feedback_echo_train() {
        let mut c = CombCoeffs::new(0.01);
        c.set_coeff_fb(0.5);
        c.set_delay_fb(100.0 / 48000.0);
        c.set_sample_rate(48000.0);
        let mut s = CombState::new();
        c.mem_set(&mut s, vec![0.0; c.mem_req()].into_boxed_slice());
        c.reset_coeffs();
        c.reset_state(&mut s, 0.0);
        let mut x = vec![0.0f32; 512];
        x[0] = 1.0;
        let mut y = vec![0.0f32; 512];
        c.process(&mut s, &x, &mut y);
        // geometric echo train at multiples of the loop delay
        assert!((y[0] - 1.0).abs() < 1e-5);
        assert!((y[100] - 0.5).abs() < 1e-4);
        assert!((y[200] - 0.25).abs() < 1e-4);
        assert!((y[300] - 0.125).abs() < 1e-4);
    }

    #[test]
    fn test_reset_steady_state() {
        let mut c = CombCoeffs::new(0.005);
        c.set_coeff_fb(0.5);
        c.set_coeff_ff(0.25);
        c.set_delay_fb(0.002);
        c.set_delay_ff(0.001);
        c.set_sample_rate(48000.0);
        let mut s = CombState::new();
        c.mem_set(&mut s, vec![0.0; c.mem_req()].into_boxed_slice());
        c.reset_coeffs();
        let y0 = c.reset_state(&mut s, 1.0);
        // v = 1/(1-0.5) = 2; y = (blend 1 + ff 0.25)·2
        assert!((y0 - 2.5).abs() < 1e-5);
        let y1 = c.process1(&mut s, 1.0);
        assert!((y1 - y0).abs() < 1e-4);
    }
}

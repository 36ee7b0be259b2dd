//! Saturator
//!
//! A tanh-shaped soft saturator with first-order antiderivative
//! antialiasing. The shaper is `f(x) = tanh(x)`; its antiderivative
//! `F(x) = ln cosh x` is evaluated overflow-free as
//! `|x| − ln 2 + ln(1 + e^(−2|x|))`. Per sample the output is the divided
//! difference `(F(x) − F(x₁))/(x − x₁)`, falling back to the midpoint rule
//! when the step is too small to divide safely.
//!
//! Input gain and bias are smoothed; the DC shift a non-zero bias would
//! introduce (`tanh(bias)`) is subtracted from the output, and optional
//! gain compensation divides the result by the input gain.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

const LN_2: f32 = core::f32::consts::LN_2;

/// `F(x) = ln cosh x`, computed without overflow for any finite `x`.
#[inline]
fn tanh_antiderivative(x: f32) -> f32 {
    let a = math::abs(x);
    a - LN_2 + math::ln1p(math::exp(-(a + a)))
}

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct SaturCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    smooth_coeffs: OnePoleCoeffs,
    smooth_gain_state: OnePoleState,
    smooth_bias_state: OnePoleState,

    // Coefficients
    bias_dc: f32,
    inv_gain: f32,

    // Parameters
    gain: f32,
    bias: f32,
    gain_compensation: bool,
}

/// Per-voice shaper memory: previous input and antiderivative.
#[derive(Debug, Clone, Default)]
pub struct SaturState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    x_z1: f32,
    f_z1: f32,
}

impl SaturState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaturCoeffs {
    /// Creates coefficients with default parameters: gain `1`, bias `0`,
    /// gain compensation off.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.005);
        smooth_coeffs.set_sticky_thresh(1e-3);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("satur_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            smooth_coeffs,
            smooth_gain_state: OnePoleState::new(),
            smooth_bias_state: OnePoleState::new(),
            bias_dc: 0.0,
            inv_gain: 1.0,
            gain: 1.0,
            bias: 0.0,
            gain_compensation: false,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
    }

    fn do_update_coeffs(&mut self, force: bool) {
        let bias_cur = self.smooth_coeffs.get_y_z1(&self.smooth_bias_state);
        if force || self.bias != bias_cur {
            let bias_cur = self
                .smooth_coeffs
                .process1_sticky_abs(&mut self.smooth_bias_state, self.bias);
            self.bias_dc = math::tanh(bias_cur);
        }
        let gain_cur = self.smooth_coeffs.get_y_z1(&self.smooth_gain_state);
        if force || self.gain != gain_cur {
            let gain_cur = self
                .smooth_coeffs
                .process1_sticky_rel(&mut self.smooth_gain_state, self.gain);
            self.inv_gain = math::rcp(gain_cur);
        }
    }

    /// Snaps the smoothed parameters to their targets and bumps the reset
    /// epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.smooth_coeffs
            .reset_state(&mut self.smooth_gain_state, self.gain);
        self.smooth_coeffs
            .reset_state(&mut self.smooth_bias_state, self.bias);
        self.do_update_coeffs(true);
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` as if `x0` had been fed forever; returns the steady
    /// output.
    pub fn reset_state(&self, state: &mut SaturState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let x = self.smooth_coeffs.get_y_z1(&self.smooth_gain_state) * x0
            + self.smooth_coeffs.get_y_z1(&self.smooth_bias_state);
        let yb = math::tanh(x);
        state.x_z1 = x;
        state.f_z1 = tanh_antiderivative(x);
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("satur_state");
            state.coeffs_reset_id = self.reset_id;
        }
        (if self.gain_compensation {
            self.inv_gain
        } else {
            1.0
        }) * (yb - self.bias_dc)
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [SaturState],
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

    /// Control-rate update: nothing to do for this primitive.
    pub fn update_coeffs_ctrl(&mut self) {}

    /// Audio-rate update: advances the gain/bias smoothers.
    pub fn update_coeffs_audio(&mut self) {
        self.do_update_coeffs(false);
    }

    /// Shapes one sample (no gain compensation).
    #[inline]
    pub fn process1(&self, state: &mut SaturState, x: f32) -> f32 {
        dsp_debug_assert!(x.is_finite());
        let x = self.smooth_coeffs.get_y_z1(&self.smooth_gain_state) * x
            + self.smooth_coeffs.get_y_z1(&self.smooth_bias_state);
        let f = tanh_antiderivative(x);
        let d = x - state.x_z1;
        let yb = if d * d < 1e-6 {
            math::tanh(0.5 * (x + state.x_z1))
        } else {
            (f - state.f_z1) * math::rcp(d)
        };
        state.x_z1 = x;
        state.f_z1 = f;
        yb - self.bias_dc
    }

    /// Shapes one sample and divides by the (smoothed) input gain.
    #[inline]
    pub fn process1_comp(&self, state: &mut SaturState, x: f32) -> f32 {
        self.inv_gain * self.process1(state, x)
    }

    /// Processes `x` into `y`, honoring the gain-compensation setting.
    pub fn process(&mut self, state: &mut SaturState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        if self.gain_compensation {
            for (yi, &xi) in y.iter_mut().zip(x) {
                self.update_coeffs_audio();
                *yi = self.process1_comp(state, xi);
            }
        } else {
            for (yi, &xi) in y.iter_mut().zip(x) {
                self.update_coeffs_audio();
                *yi = self.process1(state, xi);
            }
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(
        &mut self,
        states: &mut [SaturState],
        x: &[&[f32]],
        y: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == x.len() && states.len() == y.len());
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for (j, state) in states.iter_mut().enumerate() {
                y[j][i] = if self.gain_compensation {
                    self.process1_comp(state, x[j][i])
                } else {
                    self.process1(state, x[j][i])
                };
            }
        }
    }

    /// Sets the input gain. Valid range: `[1e-6, 1e2]`.
    pub fn set_gain(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (1e-6..=1e2).contains(&value));
        self.gain = value;
    }

    /// Sets the input bias. Valid range: `[-1e2, 1e2]`.
    pub fn set_bias(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (-1e2..=1e2).contains(&value));
        self.bias = value;
    }

    /// Enables or disables output division by the input gain.
    pub fn set_gain_compensation(&mut self, value: bool) {
        self.gain_compensation = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("satur_coeffs") {
                return false;
            }
        }
        if !(self.gain.is_finite() && (1e-6..=1e2).contains(&self.gain)) {
            return false;
        }
        if !(self.bias.is_finite() && (-1e2..=1e2).contains(&self.bias)) {
            return false;
        }
        self.smooth_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &SaturState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("satur_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        state.x_z1.is_finite() && state.f_z1.is_finite()
    }
}

impl Default for SaturCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make() -> (SaturCoeffs, SaturState) {
        let mut c = SaturCoeffs::new();
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = SaturState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_antiderivative_values() {
        use approx::assert_relative_eq;
        assert_relative_eq!(tanh_antiderivative(0.0), 0.0, epsilon = 1e-6);
        // ln cosh(1) = 0.4337808...
        assert_relative_eq!(tanh_antiderivative(1.0), 0.433_780_8, epsilon = 1e-4);
        // large-argument asymptote |x| - ln 2
        assert_relative_eq!(tanh_antiderivative(50.0), 50.0 - LN_2, epsilon = 1e-3);
        assert_relative_eq!(
            tanh_antiderivative(-50.0),
            50.0 - LN_2,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_small_signal_linearity() {
        // the divided difference lags half a sample; compare against the
        // midpoint of the surrounding inputs
        let (mut c, mut s) = make();
        let x: Vec<f32> = (0..64).map(|i| 0.01 * (i as f32 * 0.3).sin()).collect();
        let mut y = vec![0.0f32; 64];
        c.process(&mut s, &x, &mut y);
        for i in 1..64 {
            let mid = 0.5 * (x[i] + x[i - 1]);
            assert!((y[i] - mid).abs() < 1e-4);
        }
    }

    #[test]
    fn test_bounded_output() {
        let (mut c, mut s) = make();
        let x: Vec<f32> = (0..256).map(|i| 10.0 * (i as f32 * 0.7).sin()).collect();
        let mut y = vec![0.0f32; 256];
        c.process(&mut s, &x, &mut y);
        assert!(y.iter().all(|&v| v.is_finite() && v.abs() <= 1.01));
    }

    #[test]
    fn test_bias_dc_removed() {
        let mut c = SaturCoeffs::new();
        c.set_bias(0.145);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = SaturState::new();
        let y0 = c.reset_state(&mut s, 0.0);
        // idle input maps to zero output despite the bias
        assert!(y0.abs() < 1e-6);
        let y1 = c.process1(&mut s, 0.0);
        assert!(y1.abs() < 1e-4);
    }

    #[test]
    fn test_gain_compensation_small_signal() {
        let mut c = SaturCoeffs::new();
        c.set_gain(2.0);
        c.set_gain_compensation(true);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = SaturState::new();
        c.reset_state(&mut s, 0.0);
        // for tiny inputs tanh(g·x)/g ≈ x
        let x = [0.001f32; 16];
        let mut y = [0.0f32; 16];
        c.process(&mut s, &x, &mut y);
        assert!((y[15] - 0.001).abs() < 1e-4);
    }
}

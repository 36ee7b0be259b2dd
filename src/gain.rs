//! Smoothed Gain
//!
//! Multiplies its input by a gain parameter, settable in linear terms or in
//! dB, with the actual applied gain running through a one-pole smoother.
//! Many composites embed one of these wherever a level needs to move
//! click-free (mix gains, decay gains, makeup gains).

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

/// Coefficients and parameters. This primitive keeps no per-voice state:
/// the smoother it embeds is part of the shared coefficient timeline.
#[derive(Debug, Clone)]
pub struct GainCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,

    // Sub-components
    smooth_coeffs: OnePoleCoeffs,
    smooth_state: OnePoleState,

    // Parameters
    gain: f32,
}

impl GainCoeffs {
    /// Creates coefficients with default parameters: gain `1` (unity),
    /// smoothing time constant `0.05` s, sticky threshold `1e-6` (absolute).
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.05);
        smooth_coeffs.set_sticky_thresh(1e-6);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("gain_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            smooth_coeffs,
            smooth_state: OnePoleState::new(),
            gain: 1.0,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.smooth_coeffs.set_sample_rate(sample_rate);
        self.smooth_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::SetSampleRate;
        }
    }

    /// Snaps the smoothed gain to its target.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.smooth_coeffs
            .reset_state(&mut self.smooth_state, self.gain);
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
        }
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.smooth_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the gain smoother by one step.
    pub fn update_coeffs_audio(&mut self) {
        self.smooth_coeffs.update_coeffs_audio();
        self.smooth_coeffs
            .process1_sticky_abs(&mut self.smooth_state, self.gain);
    }

    /// Applies the current (smoothed) gain to one sample.
    #[inline]
    pub fn process1(&self, x: f32) -> f32 {
        dsp_debug_assert!(x.is_finite());
        self.smooth_coeffs.get_y_z1(&self.smooth_state) * x
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        for (yi, &xi) in y.iter_mut().zip(x) {
            self.update_coeffs_audio();
            *yi = self.process1(xi);
        }
    }

    /// Multi-channel [`process`](Self::process): the gain trajectory is
    /// shared, so the coefficient advance happens once per sample.
    pub fn process_multi(&mut self, x: &[&[f32]], y: &mut [&mut [f32]]) {
        dsp_debug_assert!(x.len() == y.len());
        self.update_coeffs_ctrl();
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for j in 0..y.len() {
                y[j][i] = self.process1(x[j][i]);
            }
        }
    }

    /// Sets the gain as a linear factor. Must be finite.
    pub fn set_gain_lin(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite());
        self.gain = value;
    }

    /// Sets the gain in dB. Must be finite or `-inf` (silence).
    pub fn set_gain_db(&mut self, value: f32) {
        dsp_debug_assert!(!value.is_nan() && value < f32::INFINITY);
        self.gain = if value == f32::NEG_INFINITY {
            0.0
        } else {
            math::db2lin(value)
        };
    }

    /// Sets the smoothing time constant (s).
    pub fn set_smooth_tau(&mut self, value: f32) {
        self.smooth_coeffs.set_tau(value);
    }

    /// Returns the gain target (the parameter as set).
    pub fn get_gain(&self) -> f32 {
        self.gain
    }

    /// Returns the current smoothed gain actually being applied.
    pub fn get_gain_cur(&self) -> f32 {
        self.smooth_coeffs.get_y_z1(&self.smooth_state)
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("gain_coeffs") {
                return false;
            }
        }
        self.gain.is_finite() && self.smooth_coeffs.coeffs_is_valid()
    }
}

impl Default for GainCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(gain: f32) -> GainCoeffs {
        let mut c = GainCoeffs::new();
        c.set_gain_lin(gain);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        c
    }

    #[test]
    fn test_unity_passthrough() {
        let mut c = make(1.0);
        let x = [0.5, -0.25, 1.0, 0.0];
        let mut y = [0.0; 4];
        c.process(&x, &mut y);
        assert_eq!(x, y);
    }

    #[test]
    fn test_fixed_gain() {
        let mut c = make(0.5);
        let x = [1.0, -1.0];
        let mut y = [0.0; 2];
        c.process(&x, &mut y);
        assert_eq!(y, [0.5, -0.5]);
    }

    #[test]
    fn test_db_setter() {
        let mut c = make(1.0);
        c.set_gain_db(-20.0);
        assert!((c.get_gain() - 0.1).abs() < 1e-4);
        c.set_gain_db(f32::NEG_INFINITY);
        assert_eq!(c.get_gain(), 0.0);
    }

    #[test]
    fn test_gain_change_is_smoothed() {
        let mut c = make(1.0);
        c.set_gain_lin(0.0);
        let x = [1.0f32; 8];
        let mut y = [0.0f32; 8];
        c.process(&x, &mut y);
        // still mostly near unity this early in a 50 ms glide
        assert!(y[0] > 0.9 && y[7] > 0.9);
        assert!(y[7] < y[0]);
    }

    #[test]
    fn test_smoothed_gain_reaches_zero() {
        let mut c = make(1.0);
        c.set_gain_lin(0.0);
        let x = [1.0f32; 48000];
        let mut y = [0.0f32; 48000];
        c.process(&x, &mut y);
        assert_eq!(y[47999], 0.0); // sticky snap, not asymptotic
    }
}

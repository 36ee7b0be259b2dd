//! Dry/Wet Crossfade
//!
//! Linear mix between an unprocessed and a processed signal:
//! `y = x_dry + wet·(x_wet − x_dry)`, with the wet amount running through a
//! one-pole smoother. The standard output stage for effects that keep a
//! parallel dry path (e.g. [`reverb`](crate::reverb)).

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

/// Coefficients and parameters. Stateless per voice.
#[derive(Debug, Clone)]
pub struct DryWetCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,

    // Sub-components
    smooth_coeffs: OnePoleCoeffs,
    smooth_state: OnePoleState,

    // Parameters
    wet: f32,
}

impl DryWetCoeffs {
    /// Creates coefficients with default parameters: wet `0.5`, smoothing
    /// time constant `0.05` s.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.05);
        smooth_coeffs.set_sticky_thresh(1e-6);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("drywet_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            smooth_coeffs,
            smooth_state: OnePoleState::new(),
            wet: 0.5,
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

    /// Snaps the smoothed wet amount to its target.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.smooth_coeffs
            .reset_state(&mut self.smooth_state, self.wet);
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
        }
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.smooth_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the wet smoother by one step.
    pub fn update_coeffs_audio(&mut self) {
        self.smooth_coeffs.update_coeffs_audio();
        self.smooth_coeffs
            .process1_sticky_abs(&mut self.smooth_state, self.wet);
    }

    /// Mixes one dry/wet sample pair.
    #[inline]
    pub fn process1(&self, x_dry: f32, x_wet: f32) -> f32 {
        dsp_debug_assert!(x_dry.is_finite() && x_wet.is_finite());
        let wet = self.smooth_coeffs.get_y_z1(&self.smooth_state);
        x_dry + wet * (x_wet - x_dry)
    }

    /// Mixes the dry and wet buffers into `y`.
    pub fn process(&mut self, x_dry: &[f32], x_wet: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x_dry.len() == x_wet.len() && x_dry.len() == y.len());
        self.update_coeffs_ctrl();
        for (i, yi) in y.iter_mut().enumerate() {
            self.update_coeffs_audio();
            *yi = self.process1(x_dry[i], x_wet[i]);
        }
    }

    /// Multi-channel [`process`](Self::process): the wet trajectory is
    /// shared, advanced once per sample.
    pub fn process_multi(&mut self, x_dry: &[&[f32]], x_wet: &[&[f32]], y: &mut [&mut [f32]]) {
        dsp_debug_assert!(x_dry.len() == x_wet.len() && x_dry.len() == y.len());
        self.update_coeffs_ctrl();
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for j in 0..y.len() {
                y[j][i] = self.process1(x_dry[j][i], x_wet[j][i]);
            }
        }
    }

    /// Sets the wet amount. Valid range: `[0, 1]`.
    pub fn set_wet(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (0.0..=1.0).contains(&value));
        self.wet = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("drywet_coeffs") {
                return false;
            }
        }
        if !(self.wet.is_finite() && (0.0..=1.0).contains(&self.wet)) {
            return false;
        }
        self.smooth_coeffs.coeffs_is_valid()
    }
}

impl Default for DryWetCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(wet: f32) -> DryWetCoeffs {
        let mut c = DryWetCoeffs::new();
        c.set_wet(wet);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        c
    }

    #[test]
    fn test_extremes() {
        let c = make(0.0);
        assert_eq!(c.process1(0.3, -0.8), 0.3);
        let c = make(1.0);
        assert_eq!(c.process1(0.3, -0.8), -0.8);
    }

    #[test]
    fn test_midpoint() {
        let c = make(0.5);
        assert!((c.process1(1.0, 0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_wet_change_is_smoothed() {
        let mut c = make(0.0);
        c.set_wet(1.0);
        let dry = [1.0f32; 16];
        let wet = [0.0f32; 16];
        let mut y = [0.0f32; 16];
        c.process(&dry, &wet, &mut y);
        // a 50 ms glide has barely started after 16 samples
        assert!(y[15] > 0.9 && y[15] < 1.0);
    }
}

//! Ring Modulator
//!
//! Blends a modulator signal with its product against a carrier:
//!
//! ```text
//! y = x_mod + amount·(x_car·x_mod − x_mod)
//! ```
//!
//! `amount = 0` passes the modulator through unchanged, `amount = 1` is
//! full ring modulation, and negative amounts invert the effect. The
//! amount runs through a one-pole smoother.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

/// Coefficients and parameters. Stateless per voice: the embedded smoother
/// belongs to the shared coefficient timeline.
#[derive(Debug, Clone)]
pub struct RingModCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,

    // Sub-components
    smooth_coeffs: OnePoleCoeffs,
    smooth_state: OnePoleState,

    // Parameters
    amount: f32,
}

impl RingModCoeffs {
    /// Creates coefficients with default parameters: amount `1` (full
    /// modulation), smoothing time constant `0.005` s.
    pub fn new() -> Self {
        let mut smooth_coeffs = OnePoleCoeffs::new();
        smooth_coeffs.set_tau(0.005);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("ring_mod_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            smooth_coeffs,
            smooth_state: OnePoleState::new(),
            amount: 1.0,
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

    /// Snaps the smoothed amount to its target.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.smooth_coeffs
            .reset_state(&mut self.smooth_state, self.amount);
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
        }
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.smooth_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the amount smoother by one step.
    pub fn update_coeffs_audio(&mut self) {
        self.smooth_coeffs.update_coeffs_audio();
        self.smooth_coeffs
            .process1(&mut self.smooth_state, self.amount);
    }

    /// Processes one modulator/carrier sample pair.
    #[inline]
    pub fn process1(&self, x_mod: f32, x_car: f32) -> f32 {
        dsp_debug_assert!(x_mod.is_finite() && x_car.is_finite());
        let amount = self.smooth_coeffs.get_y_z1(&self.smooth_state);
        x_mod + amount * (x_car * x_mod - x_mod)
    }

    /// Processes the modulator buffer against the carrier buffer into `y`.
    pub fn process(&mut self, x_mod: &[f32], x_car: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x_mod.len() == x_car.len() && x_mod.len() == y.len());
        self.update_coeffs_ctrl();
        for (i, yi) in y.iter_mut().enumerate() {
            self.update_coeffs_audio();
            *yi = self.process1(x_mod[i], x_car[i]);
        }
    }

    /// Multi-channel [`process`](Self::process): the amount trajectory is
    /// shared, advanced once per sample.
    pub fn process_multi(&mut self, x_mod: &[&[f32]], x_car: &[&[f32]], y: &mut [&mut [f32]]) {
        dsp_debug_assert!(x_mod.len() == x_car.len() && x_mod.len() == y.len());
        self.update_coeffs_ctrl();
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for j in 0..y.len() {
                y[j][i] = self.process1(x_mod[j][i], x_car[j][i]);
            }
        }
    }

    /// Sets the modulation amount. Valid range: `[-1, 1]`.
    pub fn set_amount(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && (-1.0..=1.0).contains(&value));
        self.amount = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("ring_mod_coeffs") {
                return false;
            }
        }
        if !(self.amount.is_finite() && (-1.0..=1.0).contains(&self.amount)) {
            return false;
        }
        self.smooth_coeffs.coeffs_is_valid()
    }
}

impl Default for RingModCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

//! Pinking Filter
//!
//! A fixed four-stage first-order filter chain that turns a white spectrum
//! into an approximately 1/f ("pink") one. Stage coefficients are
//! precomputed for a flat -3 dB/oct fit across the audio band; the optional
//! sample-rate scaling keeps the output variance independent of `fs` when
//! the input is white noise.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct PinkFiltCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Coefficients
    scaling_k: f32,

    // Parameters
    sample_rate_scaling: bool,
}

/// Per-voice filter memory: one state per stage.
#[derive(Debug, Clone, Default)]
pub struct PinkFiltState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    s1_z1: f32,
    s2_z1: f32,
    s3_z1: f32,
    s4_z1: f32,
}

impl PinkFiltState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PinkFiltCoeffs {
    /// Creates coefficients with default parameters: sample-rate scaling
    /// off.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("pink_filt_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            scaling_k: 0.0,
            sample_rate_scaling: false,
        }
    }

    /// Sets the sample rate (Hz) and derives the scaling constant
    /// `210/√fs`.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        dsp_debug_assert!(sample_rate.is_finite() && sample_rate > 0.0);
        self.scaling_k = 210.0 * math::rcp(math::sqrt(sample_rate));
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::SetSampleRate;
        }
    }

    /// Bumps the reset epoch. No coefficients are smoothed here.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` with `x0` in every stage; returns the corresponding
    /// steady output.
    pub fn reset_state(&self, state: &mut PinkFiltState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        state.s1_z1 = x0;
        state.s2_z1 = x0;
        state.s3_z1 = x0;
        state.s4_z1 = x0;
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("pink_filt_state");
            state.coeffs_reset_id = self.reset_id;
        }
        if self.sample_rate_scaling {
            self.scaling_k * x0
        } else {
            x0
        }
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [PinkFiltState],
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

    /// Audio-rate update: nothing to do for this primitive.
    pub fn update_coeffs_audio(&mut self) {}

    /// Filters one sample (without sample-rate scaling).
    #[inline]
    pub fn process1(&self, state: &mut PinkFiltState, x: f32) -> f32 {
        dsp_debug_assert!(x.is_finite());
        let s1 = 0.320_696_75 * x + state.s1_z1;
        state.s1_z1 = 0.999_760_15 * s1 - 0.320_456_9 * x;
        let s2 = 0.287_020_66 * s1 + state.s2_z1;
        state.s2_z1 = 0.997_413_52 * s2 - 0.284_434_18 * s1;
        let s3 = 0.296_286_29 * s2 + state.s3_z1;
        state.s3_z1 = 0.968_790_5 * s3 - 0.265_076_8 * s2;
        let s4 = 0.388_218_32 * s3 + state.s4_z1;
        state.s4_z1 = 0.657_378_46 * s4 - 0.045_596_78 * s3;
        s4
    }

    /// As [`process1`](Self::process1) with the sample-rate scaling factor
    /// applied.
    #[inline]
    pub fn process1_scaling(&self, state: &mut PinkFiltState, x: f32) -> f32 {
        self.scaling_k * self.process1(state, x)
    }

    /// Processes `x` into `y`, honoring the sample-rate-scaling setting.
    pub fn process(&mut self, state: &mut PinkFiltState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        if self.sample_rate_scaling {
            for (yi, &xi) in y.iter_mut().zip(x) {
                *yi = self.process1_scaling(state, xi);
            }
        } else {
            for (yi, &xi) in y.iter_mut().zip(x) {
                *yi = self.process1(state, xi);
            }
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(
        &mut self,
        states: &mut [PinkFiltState],
        x: &[&[f32]],
        y: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == x.len() && states.len() == y.len());
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            for (j, state) in states.iter_mut().enumerate() {
                y[j][i] = if self.sample_rate_scaling {
                    self.process1_scaling(state, x[j][i])
                } else {
                    self.process1(state, x[j][i])
                };
            }
        }
    }

    /// Enables or disables sample-rate-compensated output scaling.
    pub fn set_sample_rate_scaling(&mut self, value: bool) {
        self.sample_rate_scaling = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("pink_filt_coeffs") {
                return false;
            }
            if self.phase >= crate::debug::CoeffsPhase::SetSampleRate
                && !(self.scaling_k.is_finite() && self.scaling_k > 0.0)
            {
                return false;
            }
        }
        true
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &PinkFiltState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("pink_filt_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        state.s1_z1.is_finite()
            && state.s2_z1.is_finite()
            && state.s3_z1.is_finite()
            && state.s4_z1.is_finite()
    }
}

impl Default for PinkFiltCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn make() -> (PinkFiltCoeffs, PinkFiltState) {
        let mut c = PinkFiltCoeffs::new();
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = PinkFiltState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_finite_on_noise() {
        let (mut c, mut s) = make();
        let mut rng = StdRng::seed_from_u64(7);
        let x: Vec<f32> = (0..4096).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let mut y = vec![0.0f32; 4096];
        c.process(&mut s, &x, &mut y);
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_spectral_tilt() {
        // energy in a low band should exceed energy in an equally wide high
        // band by roughly the 1/f law; a crude two-band check suffices here
        let (c, mut s) = make();
        let fs = 48000.0;
        let n = 1 << 15;
        let mut rng = StdRng::seed_from_u64(21);
        let mut y = vec![0.0f32; n];
        for v in y.iter_mut() {
            *v = c.process1(&mut s, rng.gen_range(-1.0f32..1.0));
        }
        // Goertzel-style single-bin power probes
        let probe = |freq: f32| {
            let w = core::f32::consts::TAU * freq / fs;
            let (mut re, mut im) = (0.0f32, 0.0f32);
            for (i, &v) in y.iter().enumerate() {
                re += v * (w * i as f32).cos();
                im += v * (w * i as f32).sin();
            }
            re * re + im * im
        };
        let low = probe(100.0);
        let high = probe(6400.0);
        assert!(low > high, "pink tilt violated: low {low} high {high}");
    }

    #[test]
    fn test_scaling_mode() {
        let (mut c, mut s) = make();
        c.set_sample_rate_scaling(true);
        let y = c.reset_state(&mut s, 1.0);
        assert!((y - 210.0 / (48000.0f32).sqrt()).abs() < 1e-3);
    }
}

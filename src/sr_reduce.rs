//! Sample-Rate Reducer
//!
//! A zero-order-hold resampler: the output only picks up a new input value
//! every `1/ratio` samples, for the classic decimation crunch. No
//! anti-aliasing on purpose.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct SrReduceCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Parameters
    ratio: f32,
}

/// Per-voice hold memory.
#[derive(Debug, Clone, Default)]
pub struct SrReduceState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    phase: f32,
    y_z1: f32,
}

impl SrReduceState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SrReduceCoeffs {
    /// Creates coefficients with default parameters: ratio `1` (no
    /// reduction).
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("sr_reduce_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            ratio: 1.0,
        }
    }

    /// Sets the sample rate (Hz). The ratio is relative, so nothing is
    /// derived.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        dsp_debug_assert!(sample_rate.is_finite() && sample_rate > 0.0);
        let _ = sample_rate;
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::SetSampleRate;
        }
    }

    /// Bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` holding `x0`, with the next sample due to latch;
    /// returns `x0`.
    pub fn reset_state(&self, state: &mut SrReduceState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        state.phase = 1.0;
        state.y_z1 = x0;
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("sr_reduce_state");
            state.coeffs_reset_id = self.reset_id;
        }
        x0
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [SrReduceState],
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

    /// Processes one sample, latching the input whenever the hold phase
    /// rolls over.
    #[inline]
    pub fn process1(&self, state: &mut SrReduceState, x: f32) -> f32 {
        dsp_debug_assert!(x.is_finite());
        state.phase += self.ratio;
        if state.phase >= 1.0 {
            state.y_z1 = x;
            state.phase -= math::floor(state.phase);
        }
        state.y_z1
    }

    /// Processes `x` into `y`.
    pub fn process(&mut self, state: &mut SrReduceState, x: &[f32], y: &mut [f32]) {
        dsp_debug_assert!(x.len() == y.len());
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi = self.process1(state, xi);
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(
        &mut self,
        states: &mut [SrReduceState],
        x: &[&[f32]],
        y: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == x.len() && states.len() == y.len());
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            for (j, state) in states.iter_mut().enumerate() {
                y[j][i] = self.process1(state, x[j][i]);
            }
        }
    }

    /// Sets the resampling ratio. Valid range: `(0, 1]`; `1` latches every
    /// sample (identity), `0.5` every other sample, and so on.
    pub fn set_ratio(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite() && value > 0.0 && value <= 1.0);
        self.ratio = value;
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("sr_reduce_coeffs") {
                return false;
            }
        }
        self.ratio.is_finite() && self.ratio > 0.0 && self.ratio <= 1.0
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &SrReduceState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("sr_reduce_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        state.phase.is_finite() && state.y_z1.is_finite()
    }
}

impl Default for SrReduceCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_ratio_is_identity() {
        let mut c = SrReduceCoeffs::new();
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = SrReduceState::new();
        c.reset_state(&mut s, 0.0);
        let x = [0.1, -0.2, 0.3, -0.4];
        let mut y = [0.0; 4];
        c.process(&mut s, &x, &mut y);
        assert_eq!(x, y);
    }

    #[test]
    fn test_half_ratio_holds_two() {
        let mut c = SrReduceCoeffs::new();
        c.set_ratio(0.5);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = SrReduceState::new();
        c.reset_state(&mut s, 0.0);
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut y = [0.0; 6];
        c.process(&mut s, &x, &mut y);
        assert_eq!(y, [1.0, 1.0, 3.0, 3.0, 5.0, 5.0]);
    }

    #[test]
    fn test_reset_holds_initial_value() {
        let mut c = SrReduceCoeffs::new();
        c.set_ratio(0.25);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = SrReduceState::new();
        assert_eq!(c.reset_state(&mut s, 0.7), 0.7);
        // first sample latches fresh input (phase starts full)
        assert_eq!(c.process1(&mut s, 0.9), 0.9);
        // then holds for 1/ratio samples
        assert_eq!(c.process1(&mut s, 0.1), 0.9);
        assert_eq!(c.process1(&mut s, 0.2), 0.9);
        assert_eq!(c.process1(&mut s, 0.3), 0.9);
        assert_eq!(c.process1(&mut s, 0.4), 0.4);
    }
}

//! Envelope Follower
//!
//! Full-wave rectifies its input and tracks the result with an asymmetric
//! one-pole: the "up" time constant is the attack, the "down" one the
//! release. The output is a linear amplitude envelope, the raw material for
//! the dynamics processors (compressor, noise gate, PPM).

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct EnvFollowCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    one_pole_coeffs: OnePoleCoeffs,
}

/// Per-voice envelope memory.
#[derive(Debug, Clone, Default)]
pub struct EnvFollowState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    one_pole_state: OnePoleState,
}

impl EnvFollowState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EnvFollowCoeffs {
    /// Creates coefficients with default parameters: instantaneous attack
    /// and release.
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("env_follow_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            one_pole_coeffs: OnePoleCoeffs::new(),
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.one_pole_coeffs.set_sample_rate(sample_rate);
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::SetSampleRate;
        }
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.one_pole_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` with the rectified `x0`; returns the steady envelope.
    pub fn reset_state(&self, state: &mut EnvFollowState, x0: f32) -> f32 {
        dsp_debug_assert!(x0.is_finite());
        let y = self
            .one_pole_coeffs
            .reset_state(&mut state.one_pole_state, math::abs(x0));
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("env_follow_state");
            state.coeffs_reset_id = self.reset_id;
        }
        y
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial outputs.
    pub fn reset_state_multi(
        &self,
        states: &mut [EnvFollowState],
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
        self.one_pole_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.one_pole_coeffs.update_coeffs_audio();
    }

    /// Tracks one sample; returns the envelope value.
    #[inline]
    pub fn process1(&self, state: &mut EnvFollowState, x: f32) -> f32 {
        self.one_pole_coeffs
            .process1_asym(&mut state.one_pole_state, math::abs(x))
    }

    /// Processes `x`, writing the envelope into `y` if given (pass `None`
    /// to only advance the state, e.g. for metering side paths).
    pub fn process(&mut self, state: &mut EnvFollowState, x: &[f32], y: Option<&mut [f32]>) {
        self.update_coeffs_ctrl();
        match y {
            Some(y) => {
                dsp_debug_assert!(x.len() == y.len());
                for (yi, &xi) in y.iter_mut().zip(x) {
                    self.update_coeffs_audio();
                    *yi = self.process1(state, xi);
                }
            }
            None => {
                for &xi in x {
                    self.update_coeffs_audio();
                    self.process1(state, xi);
                }
            }
        }
    }

    /// Multi-channel [`process`](Self::process).
    pub fn process_multi(
        &mut self,
        states: &mut [EnvFollowState],
        x: &[&[f32]],
        y: Option<&mut [&mut [f32]]>,
    ) {
        dsp_debug_assert!(states.len() == x.len());
        self.update_coeffs_ctrl();
        let n_samples = x.first().map_or(0, |c| c.len());
        match y {
            Some(y) => {
                for i in 0..n_samples {
                    self.update_coeffs_audio();
                    for (j, state) in states.iter_mut().enumerate() {
                        y[j][i] = self.process1(state, x[j][i]);
                    }
                }
            }
            None => {
                for i in 0..n_samples {
                    self.update_coeffs_audio();
                    for (j, state) in states.iter_mut().enumerate() {
                        self.process1(state, x[j][i]);
                    }
                }
            }
        }
    }

    /// Sets the attack time constant (s).
    pub fn set_attack_tau(&mut self, value: f32) {
        self.one_pole_coeffs.set_tau_up(value);
    }

    /// Sets the release time constant (s).
    pub fn set_release_tau(&mut self, value: f32) {
        self.one_pole_coeffs.set_tau_down(value);
    }

    /// Returns the last envelope value of `state`.
    pub fn get_y_z1(&self, state: &EnvFollowState) -> f32 {
        self.one_pole_coeffs.get_y_z1(&state.one_pole_state)
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("env_follow_coeffs") {
                return false;
            }
        }
        self.one_pole_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &EnvFollowState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("env_follow_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        self.one_pole_coeffs.state_is_valid(&state.one_pole_state)
    }
}

impl Default for EnvFollowCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(attack: f32, release: f32) -> (EnvFollowCoeffs, EnvFollowState) {
        let mut c = EnvFollowCoeffs::new();
        c.set_attack_tau(attack);
        c.set_release_tau(release);
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = EnvFollowState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_envelope_is_nonnegative() {
        let (mut c, mut s) = make(0.001, 0.01);
        let x: Vec<f32> = (0..1024).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut y = vec![0.0f32; 1024];
        c.process(&mut s, &x, Some(&mut y));
        assert!(y.iter().all(|&v| v >= 0.0 && v.is_finite()));
    }

    #[test]
    fn test_rectification() {
        let (c, mut s) = make(0.0, 0.0);
        // instantaneous time constants: envelope == |x|
        assert_eq!(c.process1(&mut s, -0.7), 0.7);
        assert_eq!(c.process1(&mut s, 0.3), 0.3);
    }

    #[test]
    fn test_attack_faster_than_release() {
        let (mut c, mut s) = make(0.001, 0.1);
        // rise to ~1 quickly
        for _ in 0..480 {
            c.update_coeffs_audio();
            c.process1(&mut s, 1.0);
        }
        let peak = c.get_y_z1(&s);
        assert!(peak > 0.99);
        // release is slow: little decay over the same time
        for _ in 0..480 {
            c.update_coeffs_audio();
            c.process1(&mut s, 0.0);
        }
        assert!(c.get_y_z1(&s) > 0.8 * peak);
    }

    #[test]
    fn test_reset_steady_state() {
        let (c, mut s) = make(0.01, 0.1);
        let y0 = c.reset_state(&mut s, -0.5);
        assert_eq!(y0, 0.5);
        let y1 = c.process1(&mut s, -0.5);
        assert!((y1 - 0.5).abs() < 1e-6);
    }
}

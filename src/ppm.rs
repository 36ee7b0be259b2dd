//! Peak Programme Meter
//!
//! Envelope follower with PPM-style ballistics: instantaneous-to-fast
//! integration (settable attack) and a fixed release time constant of
//! 0.738300619235528 s, the classic 20 dB fall-back over 1.7 s. Output is
//! in dBFS, hard-floored at −600 dB when the envelope is too small to
//! take a logarithm of.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::env_follow::{EnvFollowCoeffs, EnvFollowState};
use crate::math;

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct PpmCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    env_follow_coeffs: EnvFollowCoeffs,
}

/// Per-voice meter memory.
#[derive(Debug, Clone, Default)]
pub struct PpmState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    env_follow_state: EnvFollowState,
    y_z1: f32,
}

impl PpmState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PpmCoeffs {
    /// Creates coefficients with default parameters: instantaneous
    /// integration, PPM release ballistics.
    pub fn new() -> Self {
        let mut env_follow_coeffs = EnvFollowCoeffs::new();
        env_follow_coeffs.set_release_tau(0.738_300_6);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("ppm_coeffs"),
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            env_follow_coeffs,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.env_follow_coeffs.set_sample_rate(sample_rate);
    }

    /// Forces coefficients to their target values and bumps the reset epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.env_follow_coeffs.reset_coeffs();
        #[cfg(feature = "debug-deep")]
        {
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` with the rectified `x0`; returns the steady reading
    /// in dBFS.
    pub fn reset_state(&self, state: &mut PpmState, x0: f32) -> f32 {
        let yl = self
            .env_follow_coeffs
            .reset_state(&mut state.env_follow_state, x0);
        let y = if yl >= 1e-30 { math::lin2db(yl) } else { -600.0 };
        state.y_z1 = y;
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("ppm_state");
            state.coeffs_reset_id = self.reset_id;
        }
        y
    }

    /// Resets each of the states with the corresponding initial input,
    /// optionally reporting the initial readings.
    pub fn reset_state_multi(
        &self,
        states: &mut [PpmState],
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
        self.env_follow_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update.
    pub fn update_coeffs_audio(&mut self) {
        self.env_follow_coeffs.update_coeffs_audio();
    }

    /// Meters one sample; returns the reading in dBFS.
    #[inline]
    pub fn process1(&self, state: &mut PpmState, x: f32) -> f32 {
        let yl = self
            .env_follow_coeffs
            .process1(&mut state.env_follow_state, x);
        // -600 dB is quiet enough
        let y = if yl >= 1e-30 { math::lin2db(yl) } else { -600.0 };
        state.y_z1 = y;
        y
    }

    /// Processes `x`, writing dBFS readings into `y` if given (pass `None`
    /// to only run the meter and poll [`get_y_z1`](Self::get_y_z1)).
    pub fn process(&mut self, state: &mut PpmState, x: &[f32], y: Option<&mut [f32]>) {
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
        states: &mut [PpmState],
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

    /// Sets the integration (attack) time constant (s).
    pub fn set_integration_tau(&mut self, value: f32) {
        self.env_follow_coeffs.set_attack_tau(value);
    }

    /// Returns the last reading (dBFS) of `state`.
    pub fn get_y_z1(&self, state: &PpmState) -> f32 {
        state.y_z1
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("ppm_coeffs") {
                return false;
            }
        }
        self.env_follow_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &PpmState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("ppm_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        if !state.y_z1.is_finite() || state.y_z1 < -600.0 {
            return false;
        }
        self.env_follow_coeffs
            .state_is_valid(&state.env_follow_state)
    }
}

impl Default for PpmCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make() -> (PpmCoeffs, PpmState) {
        let mut c = PpmCoeffs::new();
        c.set_sample_rate(48000.0);
        c.reset_coeffs();
        let mut s = PpmState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_silence_reads_floor() {
        let (c, mut s) = make();
        assert_eq!(c.reset_state(&mut s, 0.0), -600.0);
        assert_eq!(c.process1(&mut s, 0.0), -600.0);
    }

    #[test]
    fn test_full_scale_reads_zero() {
        let (c, mut s) = make();
        let y = c.reset_state(&mut s, 1.0);
        assert!(y.abs() < 0.1);
    }

    #[test]
    fn test_release_ballistics() {
        // after a full-scale burst, silence falls 20 dB in 1.7 s
        // (tau 0.7383 s), i.e. about -11.8 dB after the first second
        let (mut c, mut s) = make();
        c.reset_state(&mut s, 1.0);
        let silence = vec![0.0f32; 48000];
        c.process(&mut s, &silence, None);
        let after_1s = c.get_y_z1(&s);
        assert!(
            (-13.0..=-10.5).contains(&after_1s),
            "decay after 1 s = {after_1s} dB"
        );
    }

    #[test]
    fn test_reading_tracks_level() {
        let (mut c, mut s) = make();
        let x = vec![0.1f32; 4800];
        let mut y = vec![0.0f32; 4800];
        c.process(&mut s, &x, Some(&mut y));
        assert!((y[4799] + 20.0).abs() < 0.5, "0.1 FS reads {} dB", y[4799]);
    }
}

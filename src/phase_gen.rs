//! Phase Generator
//!
//! Maintains a phase in `[0, 1)` advanced by `frequency/fs` per sample.
//! The frequency parameter runs through an internal portamento smoother so
//! pitch changes glide instead of stepping. Each processed sample yields
//! both the current phase and the per-sample increment, which downstream
//! oscillator post-processors need for antialiasing.

use crate::debug::{dsp_debug_assert, dsp_debug_assert_deep};
use crate::math;
use crate::one_pole::{OnePoleCoeffs, OnePoleState};

/// Coefficients and parameters, shareable by any number of states.
#[derive(Debug, Clone)]
pub struct PhaseGenCoeffs {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    phase: crate::debug::CoeffsPhase,
    #[cfg(feature = "debug-deep")]
    reset_id: u32,

    // Sub-components
    portamento_coeffs: OnePoleCoeffs,
    portamento_state: OnePoleState,

    // Coefficients
    t: f32, // 1 / fs
    inc: f32,

    // Parameters
    frequency: f32,
}

/// Per-voice phase memory.
#[derive(Debug, Clone, Default)]
pub struct PhaseGenState {
    #[cfg(feature = "debug-deep")]
    hash: u32,
    #[cfg(feature = "debug-deep")]
    coeffs_reset_id: u32,

    phase: f32,
}

impl PhaseGenState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PhaseGenCoeffs {
    /// Creates coefficients with default parameters: frequency `1` Hz,
    /// portamento time constant `0.005` s.
    pub fn new() -> Self {
        let mut portamento_coeffs = OnePoleCoeffs::new();
        portamento_coeffs.set_tau(0.005);
        Self {
            #[cfg(feature = "debug-deep")]
            hash: crate::debug::hash_sdbm("phase_gen_coeffs"),
            #[cfg(feature = "debug-deep")]
            phase: crate::debug::CoeffsPhase::Init,
            #[cfg(feature = "debug-deep")]
            reset_id: 0,
            portamento_coeffs,
            portamento_state: OnePoleState::new(),
            t: 0.0,
            inc: 0.0,
            frequency: 1.0,
        }
    }

    /// Sets the sample rate (Hz).
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        dsp_debug_assert!(sample_rate.is_finite() && sample_rate > 0.0);
        self.portamento_coeffs.set_sample_rate(sample_rate);
        self.portamento_coeffs.reset_coeffs();
        self.t = math::rcp(sample_rate);
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::SetSampleRate;
        }
    }

    /// Snaps the portamento to the current frequency and bumps the reset
    /// epoch.
    pub fn reset_coeffs(&mut self) {
        dsp_debug_assert_deep!(self.coeffs_is_valid());
        self.portamento_coeffs
            .reset_state(&mut self.portamento_state, self.frequency);
        self.inc = self.t * self.frequency;
        #[cfg(feature = "debug-deep")]
        {
            self.phase = crate::debug::CoeffsPhase::ResetCoeffs;
            self.reset_id = self.reset_id.wrapping_add(1);
        }
    }

    /// Seeds `state` at `phase_0` (wrapped into `[0, 1)`); returns the
    /// initial `(phase, phase_inc)` pair.
    pub fn reset_state(&self, state: &mut PhaseGenState, phase_0: f32) -> (f32, f32) {
        dsp_debug_assert!(phase_0.is_finite());
        let (_, p) = math::intfrac(phase_0);
        state.phase = p;
        #[cfg(feature = "debug-deep")]
        {
            state.hash = crate::debug::hash_sdbm("phase_gen_state");
            state.coeffs_reset_id = self.reset_id;
        }
        (p, self.inc)
    }

    /// Resets each of the states with the corresponding initial phase,
    /// optionally reporting initial phases and increments.
    pub fn reset_state_multi(
        &self,
        states: &mut [PhaseGenState],
        phase_0: &[f32],
        mut y0: Option<&mut [f32]>,
        mut y_inc0: Option<&mut [f32]>,
    ) {
        dsp_debug_assert!(states.len() == phase_0.len());
        for (i, (state, &p0)) in states.iter_mut().zip(phase_0).enumerate() {
            let (p, inc) = self.reset_state(state, p0);
            if let Some(y0) = y0.as_deref_mut() {
                y0[i] = p;
            }
            if let Some(y_inc0) = y_inc0.as_deref_mut() {
                y_inc0[i] = inc;
            }
        }
    }

    /// Control-rate update.
    pub fn update_coeffs_ctrl(&mut self) {
        self.portamento_coeffs.update_coeffs_ctrl();
    }

    /// Audio-rate update: advances the portamento and re-derives the phase
    /// increment.
    pub fn update_coeffs_audio(&mut self) {
        self.portamento_coeffs.update_coeffs_audio();
        self.inc = self.t
            * self
                .portamento_coeffs
                .process1(&mut self.portamento_state, self.frequency);
    }

    /// Emits the current `(phase, phase_inc)` and advances the phase by one
    /// sample.
    #[inline]
    pub fn process1(&self, state: &mut PhaseGenState) -> (f32, f32) {
        let p = state.phase;
        state.phase += self.inc;
        state.phase -= math::floor(state.phase);
        (p, self.inc)
    }

    /// As [`process1`](Self::process1) with an extra phase-modulation input
    /// applied to the emitted phase (not accumulated).
    #[inline]
    pub fn process1_mod(&self, state: &mut PhaseGenState, x_mod: f32) -> (f32, f32) {
        dsp_debug_assert!(x_mod.is_finite());
        let p = state.phase + x_mod;
        let p = p - math::floor(p);
        state.phase += self.inc;
        state.phase -= math::floor(state.phase);
        (p, self.inc)
    }

    /// Generates `y.len()` samples of phase into `y` and the matching
    /// increments into `y_inc`.
    pub fn process(&mut self, state: &mut PhaseGenState, y: &mut [f32], y_inc: &mut [f32]) {
        dsp_debug_assert!(y.len() == y_inc.len());
        self.update_coeffs_ctrl();
        for (yi, yinci) in y.iter_mut().zip(y_inc.iter_mut()) {
            self.update_coeffs_audio();
            let (p, inc) = self.process1(state);
            *yi = p;
            *yinci = inc;
        }
    }

    /// Multi-channel [`process`](Self::process): shared coefficients, one
    /// state per channel, sample-outer/channel-inner iteration.
    pub fn process_multi(
        &mut self,
        states: &mut [PhaseGenState],
        y: &mut [&mut [f32]],
        y_inc: &mut [&mut [f32]],
    ) {
        dsp_debug_assert!(states.len() == y.len() && states.len() == y_inc.len());
        self.update_coeffs_ctrl();
        let n_samples = y.first().map_or(0, |c| c.len());
        for i in 0..n_samples {
            self.update_coeffs_audio();
            for (j, state) in states.iter_mut().enumerate() {
                let (p, inc) = self.process1(state);
                y[j][i] = p;
                y_inc[j][i] = inc;
            }
        }
    }

    /// Sets the frequency (Hz). Must be finite.
    pub fn set_frequency(&mut self, value: f32) {
        dsp_debug_assert!(value.is_finite());
        self.frequency = value;
    }

    /// Sets the portamento time constant (s).
    pub fn set_portamento_tau(&mut self, value: f32) {
        self.portamento_coeffs.set_tau(value);
    }

    /// Conservative validity check.
    pub fn coeffs_is_valid(&self) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if self.hash != crate::debug::hash_sdbm("phase_gen_coeffs") {
                return false;
            }
        }
        if !self.frequency.is_finite() {
            return false;
        }
        self.portamento_coeffs.coeffs_is_valid()
    }

    /// Conservative validity check for `state`.
    pub fn state_is_valid(&self, state: &PhaseGenState) -> bool {
        #[cfg(feature = "debug-deep")]
        {
            if state.hash != crate::debug::hash_sdbm("phase_gen_state") {
                return false;
            }
            if state.coeffs_reset_id != self.reset_id {
                return false;
            }
        }
        state.phase.is_finite() && (0.0..1.0).contains(&state.phase)
    }
}

impl Default for PhaseGenCoeffs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(fs: f32, freq: f32) -> (PhaseGenCoeffs, PhaseGenState) {
        let mut c = PhaseGenCoeffs::new();
        c.set_frequency(freq);
        c.set_sample_rate(fs);
        c.reset_coeffs();
        let mut s = PhaseGenState::new();
        c.reset_state(&mut s, 0.0);
        (c, s)
    }

    #[test]
    fn test_phase_advances_and_wraps() {
        let (mut c, mut s) = make(48000.0, 480.0);
        let mut y = [0.0f32; 200];
        let mut y_inc = [0.0f32; 200];
        c.process(&mut s, &mut y, &mut y_inc);
        // inc = 480/48000 = 0.01, so one full cycle every 100 samples
        assert!((y[1] - 0.01).abs() < 1e-5);
        assert!((y[99] - 0.99).abs() < 1e-4);
        assert!(y[100] < 0.01);
        for &p in &y {
            assert!((0.0..1.0).contains(&p));
        }
        for &i in &y_inc {
            assert!((i - 0.01).abs() < 1e-5);
        }
    }

    #[test]
    fn test_portamento_glides() {
        let (mut c, mut s) = make(48000.0, 100.0);
        c.set_frequency(1000.0);
        let mut y = [0.0f32; 4];
        let mut y_inc = [0.0f32; 4];
        c.process(&mut s, &mut y, &mut y_inc);
        // increment moves towards the new frequency but does not jump
        assert!(y_inc[3] > 100.0 / 48000.0);
        assert!(y_inc[3] < 1000.0 / 48000.0);
    }

    #[test]
    fn test_reset_state_wraps_initial_phase() {
        let (c, mut s) = make(48000.0, 100.0);
        let (p, _) = c.reset_state(&mut s, 2.25);
        assert!((p - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_phase_mod() {
        let (c, mut s) = make(48000.0, 100.0);
        let (p, _) = c.process1_mod(&mut s, 0.5);
        assert!((p - 0.5).abs() < 1e-6);
        // modulation does not affect the accumulated phase
        let (p2, _) = c.process1(&mut s);
        assert!((p2 - 100.0 / 48000.0).abs() < 1e-6);
    }
}
